use crate::client::{BonsaiClient, SessionApi};
use crate::config::BonsaiClientConfig;
use crate::error::{Error, Result};
use crate::models::{Event, EventType, SimulatorInterface, SimulatorSessionResponse, SimulatorState};
use crate::schema::Schema;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a simulator must provide to be driven by a [`SimulatorSession`].
///
/// `episode_start` and `episode_step` are required. `get_state`,
/// `get_interface` and `halted` have defaults that fail with
/// [`Error::NotImplemented`] when first called, so a simulator that forgets
/// them fails at registration or on its first advance. The remaining
/// callbacks are optional notifications.
pub trait Simulator {
    /// Current simulator state. Must not change the simulation.
    fn get_state(&self) -> Result<Schema> {
        Err(Error::NotImplemented("get_state"))
    }

    /// Interface sent to the service on registration.
    fn get_interface(&self) -> Result<SimulatorInterface> {
        Err(Error::NotImplemented("get_interface"))
    }

    /// True once the episode reached a terminal condition and no further
    /// action will result in a state.
    fn halted(&self) -> Result<bool> {
        Err(Error::NotImplemented("halted"))
    }

    /// Resets the simulation using `config`. Called at the start of each
    /// episode.
    fn episode_start(&mut self, config: &Schema) -> Result<()>;

    /// Advances the simulation by one step.
    fn episode_step(&mut self, action: &Schema) -> Result<()>;

    /// Called after the simulator was registered with the service.
    fn registered(&mut self) {
        info!("Registered.");
    }

    /// Called at the end of an episode.
    fn episode_finish(&mut self, _reason: &str) {}

    /// The service has no work; idle for `callback_time` seconds.
    fn idle(&mut self, _callback_time: f64) {
        info!("Idling...");
    }

    /// The service unregistered this simulator.
    fn unregistered(&mut self, _reason: &str) {
        info!("Unregistered.");
    }
}

/// Asks a running session to unregister and stop. Cheap to clone and safe
/// to trigger from another thread, e.g. a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one simulator against the brain service.
///
/// ```no_run
/// # use bonsai_common::*;
/// # fn demo<S: Simulator>(config: BonsaiClientConfig, sim: S) -> Result<()> {
/// let mut session = SimulatorSession::new(config, sim)?;
/// while session.run()? {}
/// # Ok(())
/// # }
/// ```
pub struct SimulatorSession<S: Simulator, C: SessionApi = BonsaiClient> {
    config: BonsaiClientConfig,
    client: C,
    simulator: S,
    registered: Option<SimulatorSessionResponse>,
    sequence_id: i64,
    interface: Option<SimulatorInterface>,
    /// An EpisodeStart arrived since registration. Steps before that are a
    /// protocol violation; steps after a finish are dispatched as they come.
    episode_started: bool,
    stop: StopHandle,
}

impl<S: Simulator> SimulatorSession<S> {
    pub fn new(config: BonsaiClientConfig, simulator: S) -> Result<Self> {
        let client = BonsaiClient::new(&config)?;
        Ok(Self::with_client(config, simulator, client))
    }
}

impl<S: Simulator, C: SessionApi> SimulatorSession<S, C> {
    pub fn with_client(config: BonsaiClientConfig, simulator: S, client: C) -> Self {
        Self {
            config,
            client,
            simulator,
            registered: None,
            sequence_id: 1,
            interface: None,
            episode_started: false,
            stop: StopHandle::default(),
        }
    }

    pub fn config(&self) -> &BonsaiClientConfig {
        &self.config
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.simulator
    }

    pub fn into_simulator(self) -> S {
        self.simulator
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn session_id(&self) -> Option<&str> {
        self.registered.as_ref().map(|r| r.session_id.as_str())
    }

    pub fn sequence_id(&self) -> i64 {
        self.sequence_id
    }

    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Does one unit of work: registers if needed, otherwise reports the
    /// state and dispatches the next event.
    ///
    /// Returns `Ok(true)` while the simulator should keep going and
    /// `Ok(false)` once it was unregistered or asked to stop. Calling
    /// `run` again after an unregister registers a new session.
    ///
    /// On any failure after registration the session is deleted on the
    /// service before the error is returned.
    pub fn run(&mut self) -> Result<bool> {
        if self.stop.is_stopped() {
            info!("Stop requested.");
            self.unregister();
            return Ok(false);
        }

        let Some(session_id) = self.session_id().map(str::to_string) else {
            self.register()?;
            return Ok(true);
        };

        match self.advance(&session_id) {
            Ok(keep_going) => Ok(keep_going),
            Err(err) => {
                error!("Exiting due to the following error: {err}");
                self.unregister();
                Err(err)
            }
        }
    }

    fn register(&mut self) -> Result<()> {
        info!("Registering Sim");
        let interface = match self.interface.clone() {
            Some(face) => face,
            None => {
                let mut face = self.simulator.get_interface()?;
                if face.simulator_context.is_none() {
                    face.simulator_context = self.config.simulator_context.clone();
                }
                self.interface = Some(face.clone());
                face
            }
        };

        let resp = self
            .client
            .create_session(&self.config.workspace, &interface)?;
        debug!(session_id = %resp.session_id, "session created");
        self.registered = Some(resp);
        self.sequence_id = 1;
        self.episode_started = false;
        self.simulator.registered();
        Ok(())
    }

    fn advance(&mut self, session_id: &str) -> Result<bool> {
        let state = SimulatorState {
            sequence_id: self.sequence_id,
            state: self.simulator.get_state()?,
            halted: self.simulator.halted()?,
        };

        let event = self
            .client
            .advance(&self.config.workspace, session_id, &state)?;
        self.sequence_id = event.sequence_id;
        info!("Received event: {}", event.event_type);

        self.dispatch_event(event)
    }

    /// Hands the event to the matching simulator callback. Returns false
    /// when the service unregistered the simulator.
    fn dispatch_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event {
                event_type: EventType::EpisodeStart,
                episode_start: Some(start),
                ..
            } => {
                self.simulator.episode_start(&start.config)?;
                self.episode_started = true;
            }

            Event {
                event_type: EventType::EpisodeStep,
                episode_step: Some(step),
                ..
            } => {
                if !self.episode_started {
                    return Err(Error::Protocol(
                        "EpisodeStep received before the first EpisodeStart".to_string(),
                    ));
                }
                self.simulator.episode_step(&step.action)?;
            }

            Event {
                event_type: EventType::EpisodeFinish,
                episode_finish: Some(finish),
                ..
            } => {
                self.simulator.episode_finish(&finish.reason);
            }

            Event {
                event_type: EventType::Idle,
                idle: Some(idle),
                ..
            } => {
                self.simulator.idle(idle.callback_time.unwrap_or(0.));
            }

            Event {
                event_type: EventType::Unregister,
                unregister: Some(unregister),
                ..
            } => {
                self.registered = None;
                self.episode_started = false;
                self.simulator.unregistered(&unregister.reason);
                return Ok(false);
            }

            Event { event_type, .. } => {
                warn!("Ignoring {event_type} event without a matching payload.")
            }
        }

        Ok(true)
    }

    /// Best effort delete of the current session. Failures are logged, not
    /// returned; the registration is dropped either way.
    fn unregister(&mut self) {
        let Some(registered) = self.registered.take() else {
            return;
        };
        self.episode_started = false;

        info!("Attempting to unregister simulator.");
        match self
            .client
            .delete_session(&self.config.workspace, &registered.session_id)
        {
            Ok(()) => info!("Successfully unregistered simulator."),
            Err(err) => error!("Unregister simulator failed with error: {err}"),
        }
    }
}

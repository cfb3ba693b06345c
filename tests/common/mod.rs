#![allow(dead_code)]

use bonsai_common::*;
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub fn schema(val: Value) -> Schema {
    val.as_object().unwrap().clone()
}

/// Implements only what the trait requires, plus state and interface.
pub struct MinimalSim;

impl Simulator for MinimalSim {
    fn get_state(&self) -> Result<Schema> {
        Ok(Schema::new())
    }

    fn get_interface(&self) -> Result<SimulatorInterface> {
        Ok(SimulatorInterface::new("minimal"))
    }

    fn halted(&self) -> Result<bool> {
        Ok(false)
    }

    fn episode_start(&mut self, _config: &Schema) -> Result<()> {
        Ok(())
    }

    fn episode_step(&mut self, _action: &Schema) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Registered,
    EpisodeStart(Schema),
    EpisodeStep(Schema),
    EpisodeFinish(String),
    Idle(f64),
    Unregistered(String),
}

/// Records every lifecycle call. Halts once `halt_after` steps were taken
/// in the current episode.
pub struct RecordingSim {
    pub calls: Vec<Call>,
    pub steps: usize,
    pub halt_after: usize,
    pub interface_calls: Cell<usize>,
    pub fail_steps: bool,
}

impl RecordingSim {
    pub fn new(halt_after: usize) -> Self {
        Self {
            calls: Vec::new(),
            steps: 0,
            halt_after,
            interface_calls: Cell::new(0),
            fail_steps: false,
        }
    }
}

impl Simulator for RecordingSim {
    fn get_state(&self) -> Result<Schema> {
        Ok(schema(json!({ "steps": self.steps })))
    }

    fn get_interface(&self) -> Result<SimulatorInterface> {
        self.interface_calls.set(self.interface_calls.get() + 1);
        Ok(SimulatorInterface::new("recording").with_timeout(60.))
    }

    fn halted(&self) -> Result<bool> {
        Ok(self.steps >= self.halt_after)
    }

    fn episode_start(&mut self, config: &Schema) -> Result<()> {
        self.steps = 0;
        self.calls.push(Call::EpisodeStart(config.clone()));
        Ok(())
    }

    fn episode_step(&mut self, action: &Schema) -> Result<()> {
        if self.fail_steps {
            return Err(Error::simulator("actuator jammed"));
        }
        self.steps += 1;
        self.calls.push(Call::EpisodeStep(action.clone()));
        Ok(())
    }

    fn registered(&mut self) {
        self.calls.push(Call::Registered);
    }

    fn episode_finish(&mut self, reason: &str) {
        self.calls.push(Call::EpisodeFinish(reason.to_string()));
    }

    fn idle(&mut self, callback_time: f64) {
        self.calls.push(Call::Idle(callback_time));
    }

    fn unregistered(&mut self, reason: &str) {
        self.calls.push(Call::Unregistered(reason.to_string()));
    }
}

pub fn registration(session_id: &str) -> SimulatorSessionResponse {
    SimulatorSessionResponse {
        session_id: session_id.to_string(),
        interface: None,
        simulator_context: None,
        registration_time: None,
        last_seen_time: None,
        iteration_rate: None,
        details: None,
        session_status: Some("Attachable".to_string()),
        session_progress: None,
    }
}

/// Plays back a fixed list of events and records what the session sent.
#[derive(Default)]
pub struct ScriptedClient {
    pub events: VecDeque<Event>,
    pub created: Vec<SimulatorInterface>,
    pub states: Vec<SimulatorState>,
    pub deleted: Vec<String>,
}

impl ScriptedClient {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl SessionApi for ScriptedClient {
    fn create_session(
        &mut self,
        _workspace: &str,
        interface: &SimulatorInterface,
    ) -> Result<SimulatorSessionResponse> {
        self.created.push(interface.clone());
        Ok(registration(&format!("session-{}", self.created.len())))
    }

    fn advance(
        &mut self,
        _workspace: &str,
        _session_id: &str,
        state: &SimulatorState,
    ) -> Result<Event> {
        self.states.push(state.clone());
        self.events
            .pop_front()
            .ok_or_else(|| Error::Protocol("script exhausted".to_string()))
    }

    fn delete_session(&mut self, _workspace: &str, session_id: &str) -> Result<()> {
        self.deleted.push(session_id.to_string());
        Ok(())
    }
}

pub fn scripted_session<S: Simulator>(
    sim: S,
    events: impl IntoIterator<Item = Event>,
) -> SimulatorSession<S, ScriptedClient> {
    SimulatorSession::with_client(
        BonsaiClientConfig::new("workspace", "1111"),
        sim,
        ScriptedClient::new(events),
    )
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Stands in for the brain service. Behaviour is picked by the workspace
/// name:
/// - unauthorized / forbidden / badgateway / unavailable / gatewaytimeout:
///   registration fails with 401 / 403 / 502 / 503 / 504.
/// - unregisterevent: every 25th advance is an Unregister event.
/// - 500: advances after the first fail with 500.
/// Otherwise the first advance starts an episode, every 25th finishes it,
/// and all others are steps, even after a finish.
#[derive(Default)]
pub struct StubState {
    pub requests: Vec<Request>,
    pub registrations: usize,
    pub deletes: usize,
    count: usize,
}

impl StubState {
    fn route(&mut self, req: Request) -> (u16, String) {
        let segments: Vec<_> = req.path.trim_matches('/').split('/').collect();
        self.requests.push(req.clone());

        match (req.method.as_str(), segments.as_slice()) {
            ("POST", ["v2", "workspaces", ws, "simulatorSessions"]) => self.register(ws),
            ("POST", ["v2", "workspaces", ws, "simulatorSessions", _, "advance"]) => {
                self.advance(ws)
            }
            ("DELETE", ["v2", "workspaces", _, "simulatorSessions", _]) => {
                self.deletes += 1;
                (204, String::new())
            }
            _ => (404, String::new()),
        }
    }

    fn register(&mut self, ws: &str) -> (u16, String) {
        self.count = 0;
        for (name, status) in [
            ("unauthorized", 401),
            ("forbidden", 403),
            ("badgateway", 502),
            ("unavailable", 503),
            ("gatewaytimeout", 504),
        ] {
            if ws.contains(name) {
                return (status, String::new());
            }
        }

        self.registrations += 1;
        let body = json!({
            "sessionId": "0123",
            "interface": {},
            "simulatorContext": {},
            "registrationTime": "2020-01-01T17:24:34.186309100Z",
            "lastSeenTime": "2020-04-20T17:24:34.186309100Z",
            "iterationRate": 0,
            "details": "",
            "sessionStatus": "Attachable",
            "sessionProgress": {},
        });
        (201, body.to_string())
    }

    fn advance(&mut self, ws: &str) -> (u16, String) {
        self.count += 1;
        let seq = self.count.to_string();

        let event = if self.count == 1 {
            json!({
                "type": "EpisodeStart",
                "sessionId": "0123",
                "sequenceId": seq,
                "episodeStart": { "config": { "length": 25 } },
            })
        } else if self.count % 25 == 0 {
            if ws.contains("unregisterevent") {
                json!({
                    "type": "Unregister",
                    "sessionId": "0123",
                    "sequenceId": seq,
                    "unregister": { "reason": "Finished", "details": "Some details" },
                })
            } else {
                json!({
                    "type": "EpisodeFinish",
                    "sessionId": "0123",
                    "sequenceId": seq,
                    "episodeFinish": { "reason": "Unspecified" },
                })
            }
        } else if ws.contains("500") {
            return (500, String::new());
        } else {
            json!({
                "type": "EpisodeStep",
                "sessionId": "0123",
                "sequenceId": seq,
                "episodeStep": { "action": { "command": 1 } },
            })
        };

        (200, event.to_string())
    }
}

pub struct StubServer {
    addr: SocketAddr,
    pub state: Arc<Mutex<StubState>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(StubState::default()));

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&shared);
                thread::spawn(move || serve(stream, &shared));
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self, workspace: &str) -> BonsaiClientConfig {
        BonsaiClientConfig::new(workspace, "1111").with_server(&self.url())
    }

    pub fn registrations(&self) -> usize {
        self.state.lock().unwrap().registrations
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn serve(mut stream: TcpStream, state: &Mutex<StubState>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();

    let (status, payload) = state.lock().unwrap().route(Request {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

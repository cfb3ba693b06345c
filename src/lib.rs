//! Simulator interface library for the Bonsai platform.
//!
//! Implement [`Simulator`] for your simulation, then hand it to a
//! [`SimulatorSession`] and call [`SimulatorSession::run`] until it returns
//! `false`. The session registers with the brain service, reports state,
//! and dispatches episode events back to the simulator.
//! NOTE: All APIs are sync and blocking.

extern crate reqwest;
extern crate serde;
extern crate serde_json;

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod schema;
pub mod session;

pub use client::{BonsaiClient, SessionApi};
pub use config::{BonsaiClientConfig, SimulatorArgs};
pub use error::{ConfigError, Error, Result};
pub use models::{
    EpisodeFinishEvent, EpisodeStartEvent, EpisodeStepEvent, Event, EventType, IdleEvent,
    SimulatorInterface, SimulatorSessionResponse, SimulatorState, UnregisterEvent,
};
pub use schema::{from_schema, to_schema, Schema};
pub use session::{Simulator, SimulatorSession, StopHandle};

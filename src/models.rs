//! Wire types exchanged with the brain service's simulator session API.

use crate::schema::Schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Describes a simulator to the service during registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorInterface {
    pub name: String,

    /// Seconds the service waits for the simulator before dropping it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_context: Option<String>,

    /// State/action/config schema description, opaque to this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Value>,
}

impl SimulatorInterface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_description(mut self, description: Value) -> Self {
        self.description = Some(description);
        self
    }
}

/// Sent with every advance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorState {
    pub sequence_id: i64,
    pub state: Schema,
    pub halted: bool,
}

/// Registration acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorSessionResponse {
    pub session_id: String,

    /// Echo of the registered interface. Often `{}`, so it stays untyped.
    #[serde(default)]
    pub interface: Option<Value>,

    #[serde(default)]
    pub simulator_context: Option<Value>,

    #[serde(default)]
    pub registration_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub iteration_rate: Option<f64>,

    #[serde(default)]
    pub details: Option<String>,

    #[serde(default)]
    pub session_status: Option<String>,

    #[serde(default)]
    pub session_progress: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Idle,
    EpisodeStart,
    EpisodeStep,
    EpisodeFinish,
    Unregister,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Idle => "Idle",
            EventType::EpisodeStart => "EpisodeStart",
            EventType::EpisodeStep => "EpisodeStep",
            EventType::EpisodeFinish => "EpisodeFinish",
            EventType::Unregister => "Unregister",
            EventType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStartEvent {
    #[serde(default)]
    pub config: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStepEvent {
    #[serde(default)]
    pub action: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeFinishEvent {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleEvent {
    /// Seconds to idle. The service often leaves it out; absent means 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnregisterEvent {
    #[serde(default)]
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// The next piece of work the service hands the simulator. Exactly one
/// payload is expected to match `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(default)]
    pub session_id: String,

    #[serde(deserialize_with = "sequence_id::deserialize")]
    pub sequence_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_start: Option<EpisodeStartEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_step: Option<EpisodeStepEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_finish: Option<EpisodeFinishEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle: Option<IdleEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unregister: Option<UnregisterEvent>,
}

impl Event {
    fn bare(event_type: EventType, sequence_id: i64) -> Self {
        Self {
            event_type,
            session_id: String::new(),
            sequence_id,
            episode_start: None,
            episode_step: None,
            episode_finish: None,
            idle: None,
            unregister: None,
        }
    }

    pub fn episode_start(sequence_id: i64, config: Schema) -> Self {
        Self {
            episode_start: Some(EpisodeStartEvent { config }),
            ..Self::bare(EventType::EpisodeStart, sequence_id)
        }
    }

    pub fn episode_step(sequence_id: i64, action: Schema) -> Self {
        Self {
            episode_step: Some(EpisodeStepEvent { action }),
            ..Self::bare(EventType::EpisodeStep, sequence_id)
        }
    }

    pub fn episode_finish(sequence_id: i64, reason: &str) -> Self {
        Self {
            episode_finish: Some(EpisodeFinishEvent {
                reason: reason.to_string(),
            }),
            ..Self::bare(EventType::EpisodeFinish, sequence_id)
        }
    }

    pub fn idle(sequence_id: i64, callback_time: Option<f64>) -> Self {
        Self {
            idle: Some(IdleEvent { callback_time }),
            ..Self::bare(EventType::Idle, sequence_id)
        }
    }

    pub fn unregister(sequence_id: i64, reason: &str) -> Self {
        Self {
            unregister: Some(UnregisterEvent {
                reason: reason.to_string(),
                details: None,
            }),
            ..Self::bare(EventType::Unregister, sequence_id)
        }
    }
}

/// The service sends sequence ids either as numbers or numeric strings.
mod sequence_id {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid sequence id {s:?}"))),
        }
    }
}

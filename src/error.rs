use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for bonsai-common.
#[derive(Debug, Error)]
pub enum Error {
    /// The service answered with a non-success status.
    #[error("HTTP {status} {reason}: {body}")]
    Http {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A simulator capability was invoked without an implementation.
    #[error("{0} not implemented.")]
    NotImplemented(&'static str),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Simulator error: {0}")]
    Simulator(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Reason phrase of an HTTP failure, e.g. "Unauthorized".
    pub fn reason(&self) -> Option<&str> {
        match self {
            Error::Http { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn simulator<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Simulator(err.into())
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

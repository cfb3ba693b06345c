use crate::error::ConfigError;
use clap::Parser;
use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "https://api.bons.ai";

pub const ENV_WORKSPACE: &str = "SIM_WORKSPACE";
pub const ENV_ACCESS_KEY: &str = "SIM_ACCESS_KEY";
pub const ENV_API_HOST: &str = "SIM_API_HOST";
pub const ENV_CONTEXT: &str = "SIM_CONTEXT";

/// Connection settings for the brain service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonsaiClientConfig {
    pub server: String,
    pub workspace: String,
    pub access_key: String,
    /// Copied into the simulator interface on registration.
    pub simulator_context: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for BonsaiClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            workspace: String::new(),
            access_key: String::new(),
            simulator_context: None,
            request_timeout: None,
        }
    }
}

impl BonsaiClientConfig {
    pub fn new(workspace: &str, access_key: &str) -> Self {
        Self {
            workspace: workspace.to_string(),
            access_key: access_key.to_string(),
            ..Default::default()
        }
    }

    pub fn with_server(mut self, server: &str) -> Self {
        self.server = server.to_string();
        self
    }

    pub fn with_simulator_context(mut self, context: &str) -> Self {
        self.simulator_context = Some(context.to_string());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Reads `SIM_WORKSPACE`, `SIM_ACCESS_KEY`, `SIM_API_HOST` and
    /// `SIM_CONTEXT`. Unset variables leave the defaults in place.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(workspace) = lookup(ENV_WORKSPACE) {
            config.workspace = workspace;
        }
        if let Some(access_key) = lookup(ENV_ACCESS_KEY) {
            config.access_key = access_key;
        }
        if let Some(server) = lookup(ENV_API_HOST) {
            config.server = server;
        }
        config.simulator_context = lookup(ENV_CONTEXT).filter(|c| !c.is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.trim().is_empty() {
            return Err(ConfigError::MissingField("workspace"));
        }
        if self.access_key.trim().is_empty() {
            return Err(ConfigError::MissingField("access_key"));
        }
        if !(self.server.starts_with("http://") || self.server.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "server",
                message: format!("'{}' is not an http(s) url", self.server),
            });
        }
        Ok(())
    }
}

/// Command line surface for simulator programs. Every flag falls back to
/// its environment variable.
#[derive(Parser, Debug, Clone)]
pub struct SimulatorArgs {
    /// Workspace id
    #[arg(long, env = ENV_WORKSPACE)]
    pub workspace: Option<String>,

    /// Access key for the workspace
    #[arg(long = "accesskey", env = ENV_ACCESS_KEY, hide_env_values = true)]
    pub access_key: Option<String>,

    /// Service host url
    #[arg(long = "api-host", env = ENV_API_HOST, default_value = DEFAULT_SERVER)]
    pub api_host: String,

    /// Simulator context forwarded on registration
    #[arg(long = "sim-context", env = ENV_CONTEXT)]
    pub sim_context: Option<String>,
}

impl SimulatorArgs {
    pub fn into_config(self) -> Result<BonsaiClientConfig, ConfigError> {
        let config = BonsaiClientConfig {
            server: self.api_host,
            workspace: self.workspace.unwrap_or_default(),
            access_key: self.access_key.unwrap_or_default(),
            simulator_context: self.sim_context.filter(|c| !c.is_empty()),
            request_timeout: None,
        };
        config.validate()?;
        Ok(config)
    }
}

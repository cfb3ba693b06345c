use crate::config::BonsaiClientConfig;
use crate::error::{Error, Result};
use crate::models::{Event, SimulatorInterface, SimulatorSessionResponse, SimulatorState};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

/// The simulator session endpoints of the brain service. The session loop
/// only talks to the service through this trait.
pub trait SessionApi {
    fn create_session(
        &mut self,
        workspace: &str,
        interface: &SimulatorInterface,
    ) -> Result<SimulatorSessionResponse>;

    /// Reports the simulator state and blocks until the service hands
    /// back the next event.
    fn advance(&mut self, workspace: &str, session_id: &str, state: &SimulatorState)
        -> Result<Event>;

    fn delete_session(&mut self, workspace: &str, session_id: &str) -> Result<()>;
}

/// Blocking HTTP client for the simulator session API.
/// NOTE: No retries. Every failure goes back to the caller.
#[derive(Debug)]
pub struct BonsaiClient {
    base_url: String,
    access_key: String,
    client: reqwest::blocking::Client,
}

impl BonsaiClient {
    pub fn new(config: &BonsaiClientConfig) -> Result<Self> {
        let mut base_url = config.server.replace("//localhost:", "//127.0.0.1:");
        if base_url.ends_with('/') {
            _ = base_url.remove(base_url.len() - 1);
        }

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            access_key: config.access_key.clone(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn make_sessions_url(&self, workspace: &str, path: &str) -> String {
        format!(
            "{}/v2/workspaces/{workspace}/simulatorSessions{path}",
            self.base_url
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let res = request.headers(self.construct_common_headers()?).send()?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }

    fn http_post<B: serde::Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        debug!(url, "POST");
        let res = self.send(self.client.post(url).json(body))?;
        let text = res.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn http_delete(&self, url: &str) -> Result<()> {
        debug!(url, "DELETE");
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn construct_common_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("bonsai-common/", env!("CARGO_PKG_VERSION"))),
        );
        let mut key = HeaderValue::from_str(&self.access_key).map_err(|_| {
            crate::error::ConfigError::InvalidValue {
                field: "access_key",
                message: "not a valid header value".to_string(),
            }
        })?;
        key.set_sensitive(true);
        headers.insert(AUTHORIZATION, key);
        Ok(headers)
    }
}

impl SessionApi for BonsaiClient {
    fn create_session(
        &mut self,
        workspace: &str,
        interface: &SimulatorInterface,
    ) -> Result<SimulatorSessionResponse> {
        let url = self.make_sessions_url(workspace, "");
        self.http_post(&url, interface)
    }

    fn advance(
        &mut self,
        workspace: &str,
        session_id: &str,
        state: &SimulatorState,
    ) -> Result<Event> {
        let url = self.make_sessions_url(workspace, &format!("/{session_id}/advance"));
        self.http_post(&url, state)
    }

    fn delete_session(&mut self, workspace: &str, session_id: &str) -> Result<()> {
        let url = self.make_sessions_url(workspace, &format!("/{session_id}"));
        self.http_delete(&url)
    }
}

//! Minimal Supabase REST client.
//!
//! Speaks to the PostgREST endpoint under `{url}/rest/v1/`: remote procedure
//! calls (`POST rpc/<function>`), table reads (`GET <table>?...`) and filtered
//! updates (`PATCH <table>?...`). Every request carries the service key in
//! both the `apikey` and `Authorization: Bearer` headers.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use ureq::Agent;

use crate::config::{SupabaseConfig, SupabaseCredentials};
use crate::error::{MaintError, MaintResult};

/// Blocking client bound to one project.
pub struct SupabaseClient {
    agent: Agent,
    credentials: SupabaseCredentials,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl SupabaseClient {
    /// Create a client with a global per-request timeout.
    pub fn new(credentials: SupabaseCredentials, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        SupabaseClient::with_agent(credentials, agent)
    }

    /// Create a client around a preconfigured agent.
    ///
    /// The agent must be built with `http_status_as_error(false)` so error
    /// bodies can be read.
    pub fn with_agent(credentials: SupabaseCredentials, agent: Agent) -> Self {
        SupabaseClient { agent, credentials }
    }

    /// Create a client from configuration and the process environment.
    pub fn from_config(config: &SupabaseConfig) -> MaintResult<Self> {
        let credentials = config.credentials()?;
        Ok(SupabaseClient::new(credentials, config.timeout()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.credentials.url,
            path.trim_start_matches('/')
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.credentials.key)
    }

    /// Call a remote procedure with named parameters.
    pub fn rpc<P: Serialize>(&self, function: &str, params: &P) -> MaintResult<Value> {
        let url = self.endpoint(&format!("rpc/{}", function));
        debug!("POST {}", url);
        let response = self
            .agent
            .post(&url)
            .header("apikey", self.credentials.key.as_str())
            .header("Authorization", self.bearer())
            .send_json(params);
        read_response(&url, response)
    }

    /// Read rows from a table. `query` is a PostgREST query string without `?`.
    pub fn select(&self, table: &str, query: &str) -> MaintResult<Value> {
        let url = format!("{}?{}", self.endpoint(table), query);
        debug!("GET {}", url);
        let response = self
            .agent
            .get(&url)
            .header("apikey", self.credentials.key.as_str())
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .call();
        read_response(&url, response)
    }

    /// Update the rows matching `filter` and return them.
    pub fn update<B: Serialize>(&self, table: &str, filter: &str, body: &B) -> MaintResult<Value> {
        let url = format!("{}?{}", self.endpoint(table), filter);
        debug!("PATCH {}", url);
        let response = self
            .agent
            .patch(&url)
            .header("apikey", self.credentials.key.as_str())
            .header("Authorization", self.bearer())
            .header("Prefer", "return=representation")
            .send_json(body);
        read_response(&url, response)
    }
}

/// Turn a ureq result into JSON, mapping transport and HTTP failures.
fn read_response(
    url: &str,
    response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> MaintResult<Value> {
    let mut response = response
        .map_err(|e| MaintError::remote(format!("request to {} failed: {}", url, e), None))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| MaintError::remote(format!("failed to read response: {}", e), Some(status)))?;
    debug!("{} -> HTTP {} ({} bytes)", url, status, body.len());

    if !(200..300).contains(&status) {
        return Err(MaintError::remote(
            format!("HTTP {}: {}", status, error_message(&body)),
            Some(status),
        ));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body)
        .map_err(|e| MaintError::remote(format!("invalid JSON response: {}", e), Some(status)))
}

/// Pull a readable message out of a PostgREST error body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    match (field("message"), field("hint")) {
        (Some(message), Some(hint)) => format!("{} (hint: {})", message, hint),
        (Some(message), None) => message,
        _ if body.trim().is_empty() => "empty response".to_string(),
        _ => body.trim().to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

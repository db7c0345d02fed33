//! Slack Web API client.

use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::trace;
use wren_core::{EngineError, EngineResult};

use crate::config::SlackConfig;

/// Thin JSON client for `https://slack.com/api/<method>`.
#[derive(Clone)]
pub struct WebApi {
    client: Client,
    base_url: String,
    token: String,
}

impl WebApi {
    pub fn new(config: &SlackConfig) -> EngineResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
        })
    }

    /// Calls `method` with the bot token.
    pub async fn call(&self, method: &str, params: Value) -> EngineResult<Value> {
        self.call_with(&self.token, method, params).await
    }

    /// Calls `method` with an explicit token.
    pub async fn call_with(&self, token: &str, method: &str, params: Value) -> EngineResult<Value> {
        let url = format!("{}/{method}", self.base_url);
        trace!(method, "Slack API call");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&params)
            .send()
            .await
            .map_err(|e| EngineError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                method: method.to_owned(),
                message: format!("HTTP {} {text}", status.as_u16()),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        check_ok(method, body)
    }
}

/// Turns a `{"ok": false, "error": ...}` response into an error.
pub fn check_ok(method: &str, body: Value) -> EngineResult<Value> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("no error specified")
        .to_owned();
    Err(EngineError::Api {
        method: method.to_owned(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_ok() {
        assert!(check_ok("auth.test", json!({"ok": true, "user": "betabot"})).is_ok());

        let err = check_ok("auth.test", json!({"ok": false, "error": "invalid_auth"})).unwrap_err();
        assert_eq!(err.to_string(), "API call 'auth.test' failed: invalid_auth");

        assert!(check_ok("auth.test", json!({})).is_err());
    }
}

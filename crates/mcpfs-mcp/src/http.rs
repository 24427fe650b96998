//! HTTP transport — one POST per JSON-RPC call.
//!
//! A mutex single-flights requests per client so request-ID/response-ID
//! pairing holds even against servers that could demultiplex; the rest of the
//! system depends only on one-in-flight.

use crate::error::McpError;
use crate::jsonrpc::{RequestSequence, Response};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to POST and what to send along.
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    pub url: String,
    /// Applied verbatim to every request.
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

/// Client for a remote MCP server reached over HTTP.
pub struct HttpClient {
    ids: RequestSequence,
    url: String,
    headers: HashMap<String, String>,
    http: reqwest::Client,
    gate: Mutex<()>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| McpError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            ids: RequestSequence::new(),
            url: config.url,
            headers: config.headers,
            http,
            gate: Mutex::new(()),
        })
    }

    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let request = self.ids.request(method, params);
        let body = serde_json::to_string(&request)?;

        let _gate = self.gate.lock().await;

        let mut req = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body);
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("http request: {e}")))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "http {}: {body}",
                status.as_u16()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| McpError::Transport(format!("read response body: {e}")))?;

        let resp: Response = serde_json::from_slice(&bytes)?;
        resp.into_result(method)
    }

    /// HTTP connections are stateless; closing is a no-op.
    pub fn close(&self) -> Result<(), McpError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_defaults() {
        let client = HttpClient::new(HttpConfig {
            url: "http://localhost:9/rpc".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url, "http://localhost:9/rpc");
        client.close().unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // Port 9 (discard) is virtually never listening.
        let client = HttpClient::new(HttpConfig {
            url: "http://127.0.0.1:9/rpc".to_string(),
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        })
        .unwrap();

        match client.send_request("initialize", None).await {
            Err(McpError::Transport(_)) => {}
            other => panic!("expected Transport error, got: {other:?}"),
        }
    }
}

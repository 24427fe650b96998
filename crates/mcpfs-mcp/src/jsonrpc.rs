//! JSON-RPC 2.0 framing for the MCP subset the filesystem speaks.
//!
//! The whole wire surface is three request methods plus one notification;
//! anything else a server sends back is ignored upstream. Request IDs are
//! minted here, atomically per transport instance starting at 1, so
//! concurrent request construction yields distinct IDs even though the
//! transports serialize below.

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

const JSONRPC_VERSION: &str = "2.0";

/// The request methods mcpfs sends. Nothing outside this list ever goes on
/// the wire.
pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// Mints request envelopes with monotonic IDs. One sequence per transport;
/// the ID space is private to that connection.
#[derive(Debug)]
pub struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn request(&self, method: &str, params: Option<Value>) -> Request {
        Request {
            jsonrpc: JSONRPC_VERSION,
            id: self.0.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        }
    }
}

impl Default for RequestSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// An outgoing request. Built through [`RequestSequence::request`] so an ID
/// is never reused within a connection.
#[derive(Debug, Serialize)]
pub struct Request {
    jsonrpc: &'static str,
    pub id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// An incoming response: `id` echoes the request, and exactly one of
/// `result` or `error` is present.
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<u64>,
    result: Option<Value>,
    error: Option<ResponseError>,
}

impl Response {
    /// Surface the wire outcome: the raw result blob for the method-specific
    /// decoder, the remote's error object as a typed error, or a protocol
    /// error when the response carries neither.
    pub fn into_result(self, method: &str) -> Result<Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result.ok_or_else(|| {
            McpError::Protocol(format!("{method} response has neither result nor error"))
        })
    }
}

/// The remote's error object.
#[derive(Debug, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The one notification mcpfs ever sends: `notifications/initialized`,
/// after a successful handshake over stdio. No `id`, no params, no response.
#[derive(Debug, Serialize)]
pub struct Notification {
    jsonrpc: &'static str,
    method: &'static str,
}

impl Notification {
    pub fn initialized() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "notifications/initialized",
        }
    }
}

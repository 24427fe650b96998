//! Client facade — uniform MCP operations over both transports.
//!
//! Handles the protocol handshake (`initialize` + `notifications/initialized`),
//! tool discovery (`tools/list`), and tool invocation (`tools/call`). The
//! transport below only moves JSON-RPC envelopes; the method-specific decoding
//! lives here.

use crate::error::McpError;
use crate::http::HttpClient;
use crate::jsonrpc::method;
use crate::stdio::StdioClient;
use serde::{Deserialize, Serialize};

/// MCP protocol version we speak.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A tool advertised by an MCP server. `inputSchema` is an opaque JSON blob
/// passed through unchanged — reparsing it would change the bytes the
/// filesystem serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "inputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<serde_json::Value>,
}

/// One content block of a tool result. Only `text` blocks are interpreted;
/// anything else renders as raw JSON downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

#[derive(Deserialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Deserialize)]
struct ServerInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct ListToolsResult {
    tools: Vec<Tool>,
}

pub(crate) fn initialize_params() -> serde_json::Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "mcpfs",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// An open connection to one MCP server, over either transport.
pub enum McpClient {
    Stdio(StdioClient),
    Http(HttpClient),
}

impl McpClient {
    async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        match self {
            Self::Stdio(c) => c.send_request(method, params).await,
            Self::Http(c) => c.send_request(method, params).await,
        }
    }

    /// Perform the MCP handshake. Must complete before any other call.
    ///
    /// The stdio transport additionally sends `notifications/initialized`
    /// after a successful exchange; HTTP servers get no notification.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let result = self
            .send_request(method::INITIALIZE, Some(initialize_params()))
            .await?;

        let init: InitializeResult = serde_json::from_value(result)?;
        tracing::debug!(
            server = %init.server_info.name,
            version = init.server_info.version.as_deref().unwrap_or(""),
            protocol = %init.protocol_version,
            "MCP server initialized"
        );

        if let Self::Stdio(c) = self {
            c.send_initialized().await?;
        }

        Ok(())
    }

    /// Fetch the server's advertised tools.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        let result = self.send_request(method::TOOLS_LIST, None).await?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Invoke a tool. `arguments` is omitted from the params when `None`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ToolResult, McpError> {
        let mut params = serde_json::Map::new();
        params.insert("name".into(), serde_json::Value::String(name.to_string()));
        if let Some(args) = arguments {
            params.insert("arguments".into(), serde_json::Value::Object(args));
        }

        let result = self
            .send_request(method::TOOLS_CALL, Some(serde_json::Value::Object(params)))
            .await?;

        let tool_result: ToolResult = serde_json::from_value(result)?;
        if tool_result.is_error {
            tracing::debug!(tool = %name, "tool call returned an error result");
        }
        Ok(tool_result)
    }

    /// Close the connection. Idempotent.
    pub async fn close(&self) -> Result<(), McpError> {
        match self {
            Self::Stdio(c) => c.close().await,
            Self::Http(c) => c.close(),
        }
    }
}

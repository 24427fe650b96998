//! MCP (Model Context Protocol) client for mcpfs.
//!
//! Speaks the JSON-RPC 2.0 subset the filesystem needs — `initialize`,
//! `notifications/initialized`, `tools/list`, and `tools/call` — over two
//! transports: a spawned child process exchanging newline-delimited messages
//! on its stdio pipes, or a remote HTTP endpoint taking one POST per call.

pub mod client;
pub mod error;
pub mod http;
pub mod jsonrpc;
pub mod stdio;

pub use client::{ContentBlock, McpClient, Tool, ToolResult};
pub use error::McpError;
pub use http::{HttpClient, HttpConfig};
pub use stdio::{StdioClient, StdioConfig};

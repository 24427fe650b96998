//! Error types for pool operations.

use mcpfs_mcp::McpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("server not found: {name}")]
    UnknownServer { name: String },

    #[error("invalid config for '{name}': {reason}")]
    InvalidServer { name: String, reason: &'static str },

    #[error("not connected")]
    NotConnected,

    #[error("pool is closed")]
    Closed,

    #[error("initialize: {0}")]
    Initialize(#[source] McpError),

    #[error("list tools: {0}")]
    ListTools(#[source] McpError),

    #[error(transparent)]
    Mcp(#[from] McpError),
}

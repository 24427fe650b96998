//! The per-server connection record.
//!
//! Two locks with distinct jobs: `establish` is held across the whole
//! create/initialize/list_tools sequence (single-flight, and it keeps the
//! reaper from closing a client mid-handshake), while `state` guards short
//! field accesses and is never held across I/O — so status snapshots stay
//! responsive while a connect is in progress.

use crate::error::PoolError;
use mcpfs_mcp::{McpClient, Tool, ToolResult};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::Mutex;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Disconnected => "disconnected",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Error => "error",
        }
    }
}

pub(crate) struct ConnState {
    pub status: Status,
    pub client: Option<Arc<McpClient>>,
    pub tools: Vec<Tool>,
    pub last_access: Instant,
    pub error: Option<String>,
}

/// Runtime record for one configured server.
pub struct Connection {
    name: String,
    pub(crate) establish: Mutex<()>,
    state: RwLock<ConnState>,
}

/// Owned snapshot of a connection's state, sharing nothing with the pool.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub name: String,
    pub status: &'static str,
    pub tool_count: usize,
    pub last_access: Instant,
    pub error: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            establish: Mutex::new(()),
            state: RwLock::new(ConnState {
                status: Status::Disconnected,
                client: None,
                tools: Vec::new(),
                last_access: Instant::now(),
                error: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, ConnState> {
        self.state.read().expect("connection state lock poisoned")
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, ConnState> {
        self.state.write().expect("connection state lock poisoned")
    }

    pub fn status(&self) -> Status {
        self.state().status
    }

    /// The tool list cached at the last successful connect.
    pub fn tools(&self) -> Vec<Tool> {
        self.state().tools.clone()
    }

    pub(crate) fn snapshot(&self) -> ConnectionInfo {
        let state = self.state();
        ConnectionInfo {
            name: self.name.clone(),
            status: state.status.as_str(),
            tool_count: state.tools.len(),
            last_access: state.last_access,
            error: state.error.clone(),
        }
    }

    /// Record a failed establishment attempt.
    pub(crate) fn fail(&self, message: String) {
        let mut state = self.state_mut();
        state.status = Status::Error;
        state.error = Some(message);
        state.client = None;
    }

    /// Invoke a tool on this connection.
    ///
    /// Touches `last_access` and grabs the client handle under the state
    /// lock, then releases it before entering the transport — concurrent
    /// calls to the same server proceed and the transport's own mutex
    /// serializes them.
    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ToolResult, PoolError> {
        let client = {
            let mut state = self.state_mut();
            state.last_access = Instant::now();
            state.client.clone()
        };

        let client = client.ok_or(PoolError::NotConnected)?;
        Ok(client.call_tool(tool, arguments).await?)
    }
}

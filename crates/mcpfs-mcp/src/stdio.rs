//! Stdio transport — a spawned child process speaking newline-delimited
//! JSON-RPC on its pipes.
//!
//! The protocol carries no reordering guarantee over the pipe, so at most one
//! request may be in flight: a mutex serializes the write-then-read pair and
//! the first line read is taken to answer the last request written.

use crate::error::McpError;
use crate::jsonrpc::{Notification, RequestSequence, Response};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// What to spawn and how.
#[derive(Debug, Clone, Default)]
pub struct StdioConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment on top of the parent's.
    pub env: HashMap<String, String>,
}

struct Pipes {
    /// `None` after close — dropping it signals EOF to the child.
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    child: Child,
    closed: bool,
}

/// Client for a child-process MCP server.
pub struct StdioClient {
    ids: RequestSequence,
    pipes: Mutex<Pipes>,
}

impl std::fmt::Debug for StdioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioClient").finish_non_exhaustive()
    }
}

impl StdioClient {
    /// Spawn the server process. Stdin and stdout are captured for the
    /// protocol; stderr passes through to the parent's.
    pub fn spawn(config: StdioConfig) -> Result<Self, McpError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            command: config.command.clone(),
            source: e,
        })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        Ok(Self {
            ids: RequestSequence::new(),
            pipes: Mutex::new(Pipes {
                stdin: Some(stdin),
                stdout: BufReader::new(stdout).lines(),
                child,
                closed: false,
            }),
        })
    }

    /// Send a request and read the next line as its response.
    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let request = self.ids.request(method, params);
        let line = serde_json::to_string(&request)?;

        let mut pipes = self.pipes.lock().await;
        if pipes.closed {
            return Err(McpError::Closed);
        }

        let stdin = pipes.stdin.as_mut().ok_or(McpError::Closed)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;

        let reply = pipes
            .stdout
            .next_line()
            .await?
            .ok_or_else(|| McpError::Transport("server closed stdout".to_string()))?;
        drop(pipes);

        let resp: Response = serde_json::from_str(&reply)?;
        resp.into_result(method)
    }

    /// Send the post-handshake notification (fire-and-forget, nothing read
    /// back).
    pub(crate) async fn send_initialized(&self) -> Result<(), McpError> {
        let line = serde_json::to_string(&Notification::initialized())?;

        let mut pipes = self.pipes.lock().await;
        if pipes.closed {
            return Err(McpError::Closed);
        }
        let stdin = pipes.stdin.as_mut().ok_or(McpError::Closed)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close stdin (signaling EOF), wait for the child, and surface a nonzero
    /// exit status as an error. Idempotent.
    pub async fn close(&self) -> Result<(), McpError> {
        let mut pipes = self.pipes.lock().await;
        if pipes.closed {
            return Ok(());
        }
        pipes.closed = true;
        pipes.stdin.take();

        let status = pipes.child.wait().await?;
        if !status.success() {
            return Err(McpError::Transport(format!("server exited with {status}")));
        }
        Ok(())
    }
}

//! Lazy connection pool over configured MCP servers.
//!
//! Connections are established on first use, cached, and torn down by a
//! background reaper once idle. Establishment is single-flight per server:
//! concurrent `get_connection` calls for the same name share one transport
//! and one `initialize` + `tools/list` exchange.

mod connection;
mod error;

pub use connection::{Connection, ConnectionInfo, Status};
pub use error::PoolError;

use mcpfs_config::{load_auth, Config, Transport};
use mcpfs_mcp::{HttpClient, HttpConfig, McpClient, StdioClient, StdioConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tuning knobs for the pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Connected-but-unused connections older than this are reaped.
    pub idle_timeout: Duration,
    /// How often the reaper scans.
    pub reap_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5 * 60),
            reap_interval: Duration::from_secs(30),
        }
    }
}

/// Pool of live connections, keyed by configured server name.
pub struct Pool {
    config: Config,
    connections: RwLock<HashMap<String, Arc<Connection>>>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
    reaper: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Pool {
    /// Create a pool with default timeouts and start its reaper.
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_options(config, PoolOptions::default())
    }

    pub fn with_options(config: Config, options: PoolOptions) -> Arc<Self> {
        let pool = Arc::new(Self {
            config,
            connections: RwLock::new(HashMap::new()),
            idle_timeout: options.idle_timeout,
            shutdown: CancellationToken::new(),
            reaper: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let handle = tokio::spawn(run_reaper(Arc::clone(&pool), options.reap_interval));
        *pool.reaper.lock().expect("reaper handle lock poisoned") = Some(handle);

        pool
    }

    /// Return a connected, usable connection for `server_name`, establishing
    /// it if necessary.
    ///
    /// The pool map lock is held only for the lookup-or-insert; the
    /// connection's own establish lock is held across the whole handshake so
    /// concurrent callers for the same name block instead of spawning
    /// duplicate clients, and the reaper cannot close a client that is still
    /// initializing.
    pub async fn get_connection(&self, server_name: &str) -> Result<Arc<Connection>, PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let conn = {
            let mut map = self.connections.write().await;
            Arc::clone(
                map.entry(server_name.to_string())
                    .or_insert_with(|| Arc::new(Connection::new(server_name))),
            )
        };

        let _establish = conn.establish.lock().await;

        {
            let mut state = conn.state_mut();
            state.last_access = Instant::now();

            if state.status == Status::Connected && state.client.is_some() {
                return Ok(Arc::clone(&conn));
            }

            // A failed attempt does not poison the record: retry from scratch.
            if state.status == Status::Error {
                state.status = Status::Disconnected;
                state.error = None;
            }

            state.status = Status::Connecting;
        }

        let client = match self.create_client(server_name) {
            Ok(client) => client,
            Err(e) => {
                conn.fail(e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = client.initialize().await {
            let _ = client.close().await;
            let e = PoolError::Initialize(e);
            conn.fail(e.to_string());
            return Err(e);
        }

        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = client.close().await;
                let e = PoolError::ListTools(e);
                conn.fail(e.to_string());
                return Err(e);
            }
        };

        tracing::info!(server = %server_name, tools = tools.len(), "MCP server connected");

        {
            let mut state = conn.state_mut();
            state.client = Some(Arc::new(client));
            state.tools = tools;
            state.status = Status::Connected;
            state.error = None;
        }

        Ok(Arc::clone(&conn))
    }

    fn create_client(&self, server_name: &str) -> Result<McpClient, PoolError> {
        let server = self
            .config
            .get_server(server_name)
            .ok_or_else(|| PoolError::UnknownServer {
                name: server_name.to_string(),
            })?;

        // Credentials are optional; a missing auth file is an empty map and
        // an unreadable one never blocks the connection.
        let auth = load_auth(Some(self.config.dir()), server_name).unwrap_or_else(|e| {
            tracing::warn!(server = %server_name, error = %e, "ignoring unreadable auth file");
            Default::default()
        });

        match server.transport {
            Transport::Stdio => {
                let command = server.command.clone().ok_or(PoolError::InvalidServer {
                    name: server_name.to_string(),
                    reason: "stdio server has no command",
                })?;
                let client = StdioClient::spawn(StdioConfig {
                    command,
                    args: server.args.clone(),
                    env: server.resolve_env(&auth),
                })?;
                Ok(McpClient::Stdio(client))
            }
            Transport::Http => {
                let url = server.url.clone().ok_or(PoolError::InvalidServer {
                    name: server_name.to_string(),
                    reason: "http server has no url",
                })?;
                let client = HttpClient::new(HttpConfig {
                    url,
                    headers: server.resolve_headers(&auth),
                    timeout: None,
                })?;
                Ok(McpClient::Http(client))
            }
        }
    }

    /// Snapshot every connection's state. The result shares nothing mutable
    /// with the pool.
    pub async fn get_status(&self) -> HashMap<String, ConnectionInfo> {
        let map = self.connections.read().await;
        map.iter()
            .map(|(name, conn)| (name.clone(), conn.snapshot()))
            .collect()
    }

    /// Remove and close one connection. Idempotent.
    pub async fn close_connection(&self, server_name: &str) {
        let conn = {
            let mut map = self.connections.write().await;
            map.remove(server_name)
        };
        let Some(conn) = conn else { return };

        let _establish = conn.establish.lock().await;
        let client = {
            let mut state = conn.state_mut();
            state.status = Status::Disconnected;
            state.error = None;
            state.client.take()
        };

        if let Some(client) = client {
            if let Err(e) = client.close().await {
                tracing::warn!(server = %server_name, error = %e, "error closing connection");
            }
        }
    }

    /// Stop the reaper, close every connection, and reject further use.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown.cancel();
        let handle = self.reaper.lock().expect("reaper handle lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let conns: Vec<Arc<Connection>> = {
            let mut map = self.connections.write().await;
            map.drain().map(|(_, conn)| conn).collect()
        };

        for conn in conns {
            let client = {
                let mut state = conn.state_mut();
                state.status = Status::Disconnected;
                state.client.take()
            };
            if let Some(client) = client {
                if let Err(e) = client.close().await {
                    tracing::warn!(server = %conn.name(), error = %e, "error closing connection");
                }
            }
        }
    }

    /// One reaper pass: collect idle names under the read lock, close them
    /// outside it.
    async fn reap_idle(&self) {
        let now = Instant::now();
        let stale: Vec<String> = {
            let map = self.connections.read().await;
            map.iter()
                .filter(|(_, conn)| {
                    let state = conn.state();
                    state.status == Status::Connected
                        && now.duration_since(state.last_access) > self.idle_timeout
                })
                .map(|(name, _)| name.clone())
                .collect()
        };

        for name in stale {
            tracing::debug!(server = %name, "reaping idle connection");
            self.close_connection(&name).await;
        }
    }
}

async fn run_reaper(pool: Arc<Pool>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = pool.shutdown.cancelled() => return,
            _ = ticker.tick() => pool.reap_idle().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn unknown_server_is_an_error() {
        let pool = Pool::new(empty_config());
        match pool.get_connection("@nope/server").await {
            Err(PoolError::UnknownServer { name }) => assert_eq!(name, "@nope/server"),
            other => panic!("expected UnknownServer, got: {other:?}"),
        }
        // The failed attempt still left a record in error state.
        let status = pool.get_status().await;
        assert_eq!(status["@nope/server"].status, "error");
        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_rejects_connections() {
        let pool = Pool::new(empty_config());
        pool.close().await;
        match pool.get_connection("@any/server").await {
            Err(PoolError::Closed) => {}
            other => panic!("expected Closed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = Pool::new(empty_config());
        pool.close().await;
        pool.close().await;
    }

    #[tokio::test]
    async fn close_unknown_connection_is_noop() {
        let pool = Pool::new(empty_config());
        pool.close_connection("@never/seen").await;
        pool.close().await;
    }

    #[tokio::test]
    async fn status_starts_empty() {
        let pool = Pool::new(empty_config());
        assert!(pool.get_status().await.is_empty());
        pool.close().await;
    }
}

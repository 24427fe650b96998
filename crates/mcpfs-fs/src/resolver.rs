//! Maps nodes to attributes, listings, and contents.
//!
//! Everything here is computed per call against the registry and the pool;
//! the one piece of retained state is the result cache, keyed by the tool
//! directory path so `.call` and `.result` share an entry.

use crate::error::FsError;
use crate::path::{parse, Node};
use mcpfs_config::{marshal_servers, parse_server_name, Config};
use mcpfs_mcp::ToolResult;
use mcpfs_pool::{Pool, PoolError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// What a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

/// Attributes for one node. Sizes are exact where cheap to compute and zero
/// where content would require a connection; files are served with direct
/// I/O, so the kernel does not rely on them.
#[derive(Debug, Clone, Copy)]
pub struct Attr {
    pub kind: EntryKind,
    pub perm: u16,
    pub size: u64,
}

const DIR_ATTR: Attr = Attr {
    kind: EntryKind::Dir,
    perm: 0o755,
    size: 0,
};

fn file_attr(perm: u16, size: u64) -> Attr {
    Attr {
        kind: EntryKind::File,
        perm,
        size,
    }
}

/// Resolves paths against the registry, the pool, and the result cache.
pub struct Resolver {
    config: Config,
    pool: Arc<Pool>,
    results: RwLock<HashMap<String, ToolResult>>,
}

impl Resolver {
    pub fn new(config: Config, pool: Arc<Pool>) -> Self {
        Self {
            config,
            pool,
            results: RwLock::new(HashMap::new()),
        }
    }

    pub fn parse(&self, path: &str) -> Option<Node> {
        parse(path, &self.config)
    }

    /// Attributes for a path. Never invokes a tool; may establish a
    /// connection to check tool existence.
    pub async fn getattr(&self, path: &str) -> Result<Attr, FsError> {
        match self.parse(path).ok_or(FsError::NotFound)? {
            Node::Root | Node::ConfigDir | Node::Scope(_) | Node::Server(_) => Ok(DIR_ATTR),
            Node::ConfigFile => {
                let data = marshal_servers(&self.config.servers).unwrap_or_default();
                Ok(file_attr(0o444, data.len() as u64))
            }
            Node::StatusFile(server) => {
                let data = self.status_content(&server).await;
                Ok(file_attr(0o444, data.len() as u64))
            }
            Node::SchemaFile(_) | Node::ToolSchemaFile { .. } => Ok(file_attr(0o444, 0)),
            Node::ToolDir { server, tool } => {
                let conn = self.connect(&server).await?;
                if conn.tools().iter().any(|t| t.name == tool) {
                    Ok(DIR_ATTR)
                } else {
                    Err(FsError::NotFound)
                }
            }
            Node::CallFile { .. } => Ok(file_attr(0o666, 0)),
            Node::ResultFile { server, tool } => {
                let results = self.results.read().await;
                let size = results
                    .get(&result_key(&server, &tool))
                    .map_or(NO_RESULT.len(), |r| render_result(r).len());
                Ok(file_attr(0o444, size as u64))
            }
        }
    }

    /// List a directory. `.` and `..` are the adapter's job.
    pub async fn readdir(&self, path: &str) -> Result<Vec<(String, EntryKind)>, FsError> {
        match self.parse(path).ok_or(FsError::NotFound)? {
            Node::Root => {
                let mut entries = vec![(".config".to_string(), EntryKind::Dir)];
                let mut scopes = BTreeSet::new();
                for name in self.config.servers.keys() {
                    match parse_server_name(name).0 {
                        Some(scope) => {
                            scopes.insert(scope);
                        }
                        None => entries.push((name.clone(), EntryKind::Dir)),
                    }
                }
                entries.extend(scopes.into_iter().map(|s| (s, EntryKind::Dir)));
                Ok(entries)
            }
            Node::ConfigDir => Ok(vec![("servers.json".to_string(), EntryKind::File)]),
            Node::Scope(scope) => {
                let servers = self
                    .config
                    .servers
                    .keys()
                    .filter_map(|name| {
                        let (s, short) = parse_server_name(name);
                        (s.as_deref() == Some(scope.as_str()))
                            .then_some((short, EntryKind::Dir))
                    })
                    .collect();
                Ok(servers)
            }
            Node::Server(server) => {
                let mut entries = vec![
                    (".status".to_string(), EntryKind::File),
                    (".schema".to_string(), EntryKind::File),
                ];
                // A failed connection still lists the metadata files.
                if let Ok(conn) = self.connect(&server).await {
                    entries.extend(
                        conn.tools()
                            .into_iter()
                            .map(|t| (t.name, EntryKind::Dir)),
                    );
                }
                Ok(entries)
            }
            Node::ToolDir { .. } => Ok(vec![
                (".schema".to_string(), EntryKind::File),
                (".call".to_string(), EntryKind::File),
                (".result".to_string(), EntryKind::File),
            ]),
            _ => Err(FsError::NotFound),
        }
    }

    /// Whether an open with the given access is allowed. Pure capability
    /// check; nothing is fetched or invoked.
    pub fn check_open(&self, path: &str, write: bool) -> Result<(), FsError> {
        match self.parse(path).ok_or(FsError::NotFound)? {
            Node::CallFile { .. } => Ok(()),
            _ if write => Err(FsError::PermissionDenied),
            _ => Ok(()),
        }
    }

    /// Full content for a file node. Reading `.call` invokes the tool with
    /// empty arguments.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        match self.parse(path).ok_or(FsError::NotFound)? {
            Node::Root | Node::ConfigDir | Node::Scope(_) | Node::Server(_) | Node::ToolDir { .. } => {
                Err(FsError::IsDirectory)
            }
            Node::ConfigFile => Ok(marshal_servers(&self.config.servers).unwrap_or_default()),
            Node::StatusFile(server) => Ok(self.status_content(&server).await),
            Node::SchemaFile(server) => {
                let conn = self.connect(&server).await?;
                let mut data = serde_json::to_vec_pretty(&conn.tools()).unwrap_or_default();
                data.push(b'\n');
                Ok(data)
            }
            Node::ToolSchemaFile { server, tool } => {
                let conn = self.connect(&server).await?;
                let tools = conn.tools();
                let tool = tools
                    .iter()
                    .find(|t| t.name == tool)
                    .ok_or(FsError::NotFound)?;
                let mut data = serde_json::to_vec_pretty(tool).unwrap_or_default();
                data.push(b'\n');
                Ok(data)
            }
            Node::CallFile { server, tool } => match self.invoke(&server, &tool, None).await {
                Ok(result) => {
                    let data = render_result(&result);
                    self.cache_result(&server, &tool, result).await;
                    Ok(data)
                }
                Err(e) => Ok(format!("error: {e}\n").into_bytes()),
            },
            Node::ResultFile { server, tool } => {
                let results = self.results.read().await;
                Ok(results
                    .get(&result_key(&server, &tool))
                    .map_or_else(|| NO_RESULT.to_vec(), |r| render_result(r)))
            }
        }
    }

    /// Accept written bytes. Only `.call` is writable: the bytes must parse
    /// as a JSON object, which becomes the tool's argument map. The write is
    /// acknowledged only after the remote call returns.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<usize, FsError> {
        match self.parse(path).ok_or(FsError::NotFound)? {
            Node::CallFile { server, tool } => {
                let args: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_slice(data).map_err(|_| FsError::InvalidArgument)?;

                let result = self
                    .invoke(&server, &tool, Some(args))
                    .await
                    .map_err(|e| FsError::Io(e.to_string()))?;
                self.cache_result(&server, &tool, result).await;
                Ok(data.len())
            }
            _ => Err(FsError::PermissionDenied),
        }
    }

    /// Drop all cached invocation results (unmount).
    pub async fn clear_results(&self) {
        self.results.write().await.clear();
    }

    async fn connect(&self, server: &str) -> Result<Arc<mcpfs_pool::Connection>, FsError> {
        self.pool
            .get_connection(server)
            .await
            .map_err(|e| FsError::Io(e.to_string()))
    }

    async fn invoke(
        &self,
        server: &str,
        tool: &str,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ToolResult, PoolError> {
        let conn = self.pool.get_connection(server).await?;
        conn.call_tool(tool, args).await
    }

    async fn cache_result(&self, server: &str, tool: &str, result: ToolResult) {
        self.results
            .write()
            .await
            .insert(result_key(server, tool), result);
    }

    async fn status_content(&self, server: &str) -> Vec<u8> {
        let status = self.pool.get_status().await;
        match status.get(server) {
            None => b"disconnected\n".to_vec(),
            Some(info) => {
                let mut out = format!("status: {}\n", info.status);
                if info.tool_count > 0 {
                    out.push_str(&format!("tools: {}\n", info.tool_count));
                }
                if let Some(error) = &info.error {
                    out.push_str(&format!("error: {error}\n"));
                }
                out.into_bytes()
            }
        }
    }
}

const NO_RESULT: &[u8] = b"(no result yet)\n";

fn result_key(server: &str, tool: &str) -> String {
    format!("{server}/{tool}")
}

/// Render a tool result: the first text block's text plus a newline
/// (`error: `-prefixed when the result is an error), or the whole content
/// array as indented JSON when no text block exists.
pub(crate) fn render_result(result: &ToolResult) -> Vec<u8> {
    for block in &result.content {
        if block.kind == "text" {
            let line = if result.is_error {
                format!("error: {}\n", block.text)
            } else {
                format!("{}\n", block.text)
            };
            return line.into_bytes();
        }
    }
    let mut data = serde_json::to_vec_pretty(&result.content).unwrap_or_default();
    data.push(b'\n');
    data
}

//! Virtual filesystem tree over the MCP connection pool.
//!
//! The tree is a thin projection of live state: directories come from the
//! server registry and each connection's cached tool list, file contents are
//! computed per read, and the only mutable state beyond the pool is the
//! per-tool invocation result cache.
//!
//! ```text
//! /                                    root
//! /.config/servers.json                the registry, readable
//! /<scope>/<server>/.status            connection status text
//! /<scope>/<server>/.schema            all tools as a JSON array
//! /<scope>/<server>/<tool>/.schema     one tool as a JSON object
//! /<scope>/<server>/<tool>/.call       write JSON args to invoke
//! /<scope>/<server>/<tool>/.result     last invocation result
//! ```
//!
//! Servers with bare (unscoped) names root their subtree directly under `/`.

pub mod error;
pub mod fuse;
pub mod mount;
pub mod path;
pub mod resolver;

pub use error::{FsError, MountError};
pub use fuse::McpFuse;
pub use mount::{mount, unmount, MountOptions};
pub use path::Node;
pub use resolver::{Attr, EntryKind, Resolver};

//! Error types for the filesystem layer.

use thiserror::Error;

/// Resolver-level failures, mapped to errno values by the FUSE adapter.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such path")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("is a directory")]
    IsDirectory,

    #[error("I/O error: {0}")]
    Io(String),
}

/// Failures mounting or serving the filesystem.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("load config: {0}")]
    Config(#[from] mcpfs_config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

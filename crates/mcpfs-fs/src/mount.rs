//! Mount lifecycle: config → pool → FUSE session → shutdown.

use crate::error::MountError;
use crate::fuse::McpFuse;
use crate::resolver::Resolver;
use fuser::MountOption;
use mcpfs_config::Config;
use mcpfs_pool::Pool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MountOptions {
    pub mountpoint: PathBuf,
    /// Config directory; `None` means `~/.mcp/.config`.
    pub config_dir: Option<PathBuf>,
}

/// Mount the filesystem and serve until ctrl-c, then tear everything down:
/// unmount first, then stop the pool (reaper included) and close every
/// connection.
pub async fn mount(options: MountOptions) -> Result<(), MountError> {
    let config = Config::load(options.config_dir.as_deref())?;
    let pool = Pool::new(config.clone());
    let resolver = Arc::new(Resolver::new(config, Arc::clone(&pool)));
    let fs = McpFuse::new(resolver, tokio::runtime::Handle::current());

    let session = fuser::spawn_mount2(
        fs,
        &options.mountpoint,
        &[
            MountOption::FSName("mcpfs".to_string()),
            MountOption::DefaultPermissions,
        ],
    )?;

    tracing::info!(mountpoint = %options.mountpoint.display(), "mounted");
    println!("mounted at {}", options.mountpoint.display());
    println!("press ctrl+c to unmount");

    tokio::signal::ctrl_c().await?;
    println!("\nshutting down...");

    drop(session);
    pool.close().await;

    Ok(())
}

/// Ask the host to unmount. Tries `fusermount -u` (Linux) and falls back to
/// `umount`.
pub fn unmount(mountpoint: &Path) -> std::io::Result<()> {
    if let Ok(status) = std::process::Command::new("fusermount")
        .arg("-u")
        .arg(mountpoint)
        .status()
    {
        if status.success() {
            return Ok(());
        }
    }

    let status = std::process::Command::new("umount")
        .arg(mountpoint)
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "unmount {} failed",
            mountpoint.display()
        )))
    }
}

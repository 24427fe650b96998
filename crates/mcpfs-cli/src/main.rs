//! mcpfs CLI — mount MCP servers as a FUSE filesystem.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcpfs_config::{Config, Transport};
use mcpfs_fs::MountOptions;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mcpfs", version, about = "Mount MCP servers as a FUSE filesystem")]
struct Cli {
    /// Config directory (default: ~/.mcp/.config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mount the MCP filesystem
    Mount { mountpoint: PathBuf },

    /// Unmount the MCP filesystem
    Umount { mountpoint: PathBuf },

    /// Add an MCP server to the config
    Add {
        name: String,

        /// HTTP server URL (for http transport)
        #[arg(long)]
        url: Option<String>,

        /// Command and arguments to spawn (for stdio transport)
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Store an auth token for a server
    Auth { server: String, token: String },

    /// Show server connection status
    Status,

    /// List configured servers
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Mount { mountpoint } => {
            std::fs::create_dir_all(&mountpoint).context("create mountpoint")?;
            mcpfs_fs::mount(MountOptions {
                mountpoint,
                config_dir: cli.config,
            })
            .await
            .context("mount")?;
        }
        Command::Umount { mountpoint } => {
            mcpfs_fs::unmount(&mountpoint).context("unmount")?;
            println!("unmounted {}", mountpoint.display());
        }
        Command::Add { name, url, command } => {
            run_add(cli.config.as_deref(), &name, url, command)?;
        }
        Command::Auth { server, token } => {
            mcpfs_config::save_token(cli.config.as_deref(), &server, &token)
                .context("save token")?;
            println!("saved auth token for {server}");
        }
        Command::Status => {
            println!("server status:");
            println!("  (mount the filesystem and read the .status files)");
        }
        Command::List => run_list(cli.config.as_deref())?,
    }

    Ok(())
}

fn run_add(
    config_dir: Option<&Path>,
    name: &str,
    url: Option<String>,
    command: Vec<String>,
) -> Result<()> {
    let mut config = Config::load(config_dir).context("load config")?;

    if let Some(url) = url {
        config.add_http_server(
            name,
            url,
            HashMap::from([(
                "Authorization".to_string(),
                "Bearer ${auth.token}".to_string(),
            )]),
        );
        println!("added http server: {name}");
    } else if let Some((program, args)) = command.split_first() {
        config.add_stdio_server(name, program, args.to_vec(), HashMap::new());
        println!("added stdio server: {name}");
    } else {
        anyhow::bail!("must provide --url or a command after --");
    }

    config.save().context("save config")?;
    Ok(())
}

fn run_list(config_dir: Option<&Path>) -> Result<()> {
    let config = Config::load(config_dir).context("load config")?;

    if config.servers.is_empty() {
        println!("no servers configured");
        println!("use 'mcpfs add <name> -- <command>' to add a stdio server");
        println!("or 'mcpfs add <name> --url <url>' to add an http server");
        return Ok(());
    }

    println!("configured servers:");
    for (name, server) in &config.servers {
        match server.transport {
            Transport::Stdio => println!(
                "  {name} (stdio): {} {:?}",
                server.command.as_deref().unwrap_or(""),
                server.args
            ),
            Transport::Http => {
                println!("  {name} (http): {}", server.url.as_deref().unwrap_or(""))
            }
        }
    }

    Ok(())
}

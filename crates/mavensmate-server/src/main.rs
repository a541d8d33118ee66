//! MavensMate server binary.

use anyhow::{Context, Result};
use clap::Parser;
use mavensmate_core::ServerConfig;
use mavensmate_server::Server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mavensmate-server")]
#[command(about = "MavensMate local companion server")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.mavensmate/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Additional workspace root, may be repeated
    #[arg(short = 'w', long = "workspace")]
    workspaces: Vec<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServerConfig::load(),
    };

    if let Some(listen) = &cli.listen {
        config.listen = listen.clone();
    }
    config.mm_workspace.extend(cli.workspaces.iter().cloned());

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting MavensMate server v{}", env!("CARGO_PKG_VERSION"));

    let server = Server::new(config);
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(server.run())
}

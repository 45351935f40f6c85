//! Command-line interface for the codedeck server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::server;

/// Backend engine for a browser-based coding workspace.
#[derive(Debug, Parser)]
#[command(name = "codedeck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the workspace server (default).
    Serve {
        /// Override the configured listen port.
        #[arg(long)]
        port: Option<u16>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Command::Serve { port: None });
    match command {
        Command::Serve { port } => {
            let mut config = server::load_config()?;
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting codedeck v{}", env!("CARGO_PKG_VERSION"));
            server::run(config).await
        }
    }
}

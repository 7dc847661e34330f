// Copyright 2026 Pagelite Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pagelite::config::AiConfig;
use pagelite::rest::{self, AppState};
use std::sync::Arc;

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8000;

#[derive(Parser)]
#[command(
    name = "pagelite",
    about = "Pagelite — bandwidth-saving web middleware",
    version,
    after_help = "Run 'pagelite serve' (the default) to start the HTTP server."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => serve(DEFAULT_PORT, cli.verbose).await,
        Some(Commands::Serve { port }) => serve(port, cli.verbose).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pagelite", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn serve(port: u16, verbose: bool) -> Result<()> {
    let directive = if verbose { "pagelite=debug" } else { "pagelite=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("static directive parses")),
        )
        .init();

    tracing::info!("starting pagelite v{}", env!("CARGO_PKG_VERSION"));

    let config = AiConfig::from_env();
    let state = Arc::new(AppState::new(&config));
    rest::start(port, state).await
}

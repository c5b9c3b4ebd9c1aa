// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use orka::config::Config;

/// Orchestrates assistant sessions, their branches, and the supervisors
/// that drive them.
#[derive(Parser)]
#[command(name = "orka", version, about)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    subcommand: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the long-running daemon hosting the control surface and hook
    /// receiver. This is the default when no subcommand is given.
    Serve,
    /// Write `~/.orka/config.json` and `~/.orka-agents/agents.json` if
    /// they don't already exist.
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = cli.config;

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    match cli.subcommand {
        Some(Commands::Init) => {
            if let Err(e) = orka::run::init(&config).await {
                error!("fatal: {e:#}");
                std::process::exit(1);
            }
        }
        Some(Commands::Serve) | None => {
            if let Err(e) = orka::run::run(config).await {
                error!("fatal: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

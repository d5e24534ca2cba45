// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a grounded chat-turn orchestration service.

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parley - a grounded chat-turn orchestration service.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP gateway (the default).
    Serve,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("parley: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            println!(
                "parley: configuration OK (agent.name={}, search.backends=[{}])",
                config.agent.name,
                config.search.backends.join(", ")
            );
        }
    }
}

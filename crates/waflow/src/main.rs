// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waflow binary entry point.
//!
//! Dispatches CLI subcommands. Configuration is loaded and validated before
//! any command runs; config errors render as miette diagnostics and abort.

mod doctor;
mod serve;

use clap::{Parser, Subcommand};
use waflow_config::WaflowConfig;
use waflow_core::WaflowError;

#[derive(Parser)]
#[command(
    name = "waflow",
    version,
    about = "Multi-tenant WhatsApp ingestion and flow orchestration"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server.
    Serve,
    /// Print the resolved configuration as TOML.
    Config,
    /// Check configuration, storage, and per-tenant flow plans.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match waflow_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            waflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve::run_serve(config).await,
        Command::Config => print_config(&config),
        Command::Doctor => doctor::run_doctor(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &WaflowConfig) -> Result<(), WaflowError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| WaflowError::Internal(format!("failed to render configuration: {e}")))?;
    println!("{rendered}");
    Ok(())
}

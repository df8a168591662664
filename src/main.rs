//! handoff - cancellation-aware single-slot handoff between tasks.
//!
//! This is the main entry point for the demo CLI.

use clap::Parser;
use std::process::ExitCode;

use handoff::cli::Commands;
use handoff::config::resolve_settings;
use handoff::logging;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Commands::parse();

    let (settings, load_err) = match resolve_settings(args.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let _guard = match logging::init(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(e) = load_err {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
    }

    // Run the command
    match args.run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

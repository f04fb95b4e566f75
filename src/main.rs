// Harvester - Resumable FHIR Encounter Harvester
// Copyright (c) 2025 Harvester Contributors
// Licensed under the MIT License

use clap::Parser;
use harvester::cli::{Cli, Commands};
use harvester::config::{load_config_unchecked, LoggingConfig};
use harvester::core::harvest::summary::EXIT_FATAL;
use harvester::logging::{init_logging, LoggingGuard};
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging_guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Harvester - Resumable FHIR Encounter Harvester"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to install SIGTERM handler; listening for Ctrl+C only"
                    );
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        return;
                    }
                    tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
        }

        println!("\n⚠️  Shutdown signal received, finishing the current day...");
        let _ = shutdown_tx.send(true);
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    // Flush file logs before exiting
    drop(logging_guard);
    process::exit(exit_code);
}

/// Console logging for every command; the harvest command also writes the
/// rotating JSON files described in the `[logging]` section
fn setup_logging(cli: &Cli) -> harvester::domain::Result<LoggingGuard> {
    let console_only = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };

    let config = match &cli.command {
        Commands::Harvest(_) => load_config_unchecked(&cli.config).ok(),
        _ => None,
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let logging_config = config.map(|c| c.logging).unwrap_or(console_only.clone());

    match init_logging(&level, &logging_config) {
        Ok(guard) => Ok(guard),
        Err(e) if logging_config.local_enabled => {
            eprintln!("File logging unavailable ({e}); logging to console only");
            init_logging(&level, &console_only)
        }
        Err(e) => Err(e),
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Harvest(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}

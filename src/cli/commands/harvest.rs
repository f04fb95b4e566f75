//! Harvest command implementation
//!
//! This module implements the `harvest` command, which walks the configured
//! date window and publishes enriched encounters to the queue.

use crate::config::{load_config_with, HarvesterConfig};
use crate::core::harvest::summary::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_SUCCESS};
use crate::core::harvest::{HarvestCoordinator, HarvestSummary};
use crate::domain::calendar::format_date;
use crate::domain::errors::HarvestError;
use clap::Args;
use std::io::{self, IsTerminal, Write};
use tokio::sync::watch;

/// Arguments for the harvest command
#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - keep checkpoints in memory and log messages instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the first date of the window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<String>,

    /// Override the last date of the window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<String>,

    /// Override the per-day task limit (0 = unbounded)
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,
}

impl HarvestArgs {
    /// Execute the harvest command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting harvest command");

        let config = match load_config_with(config_path, |config| self.apply_overrides(config)) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("{e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no messages will be sent");
            println!("🔍 DRY RUN MODE - No messages will be sent to the queue");
            println!();
        }

        // Only prompt when someone is there to answer
        if !self.yes && !config.application.dry_run && io::stdin().is_terminal() {
            Self::print_plan(&config);
            print!("Proceed with harvest? [y/N]: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Harvest cancelled.");
                return Ok(EXIT_SUCCESS);
            }
        }

        tracing::info!("Creating harvest coordinator");
        let coordinator = match HarvestCoordinator::connect(&config, shutdown_signal).await {
            Ok(c) => c,
            Err(e @ HarvestError::Configuration(_)) => {
                tracing::error!(error = %e, "Invalid harvest settings");
                eprintln!("{e}");
                return Ok(EXIT_CONFIG);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create harvest coordinator");
                eprintln!("Failed to initialize harvest: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        println!("🚀 Starting harvest...");
        println!();

        let summary = match coordinator.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Harvest failed");
                eprintln!("Harvest failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        Self::print_summary(&summary);

        Ok(summary.exit_code())
    }

    fn apply_overrides(&self, config: &mut HarvesterConfig) {
        if let Some(start) = &self.start_date {
            tracing::info!(start_date = %start, "Overriding start date from CLI");
            config.harvest.start_date = start.clone();
        }

        if let Some(end) = &self.end_date {
            tracing::info!(end_date = %end, "Overriding end date from CLI");
            config.harvest.end_date = end.clone();
        }

        if let Some(limit) = self.max_concurrency {
            tracing::info!(max_concurrency = limit, "Overriding max concurrency from CLI");
            config.harvest.max_concurrency = limit;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
    }

    fn print_plan(config: &HarvesterConfig) {
        println!("Harvest Configuration:");
        println!("  Source: {}", config.source.base_url);
        println!(
            "  Window: {} .. {}",
            config.harvest.start_date, config.harvest.end_date
        );
        println!("  Group keys: {:?}", config.harvest.group_keys);
        println!(
            "  Max concurrency: {}",
            match config.harvest.max_concurrency {
                0 => "unbounded".to_string(),
                n => n.to_string(),
            }
        );
        println!("  Queue: {}", config.queue.queue_url);
        println!();
    }

    fn print_summary(summary: &HarvestSummary) {
        println!();
        println!("📊 Harvest Summary:");
        if let Some(resumed) = summary.resumed_at {
            println!("  Resumed at: {}", format_date(resumed));
        }
        println!("  Days processed: {}", summary.days_processed);
        println!("  Entries seen: {}", summary.entries_seen);
        println!("  Published: {}", summary.published);
        println!("  Quarantined: {}", summary.quarantined);
        println!("  Skipped: {}", summary.skipped);
        println!(
            "  Cursor: {}",
            summary
                .cursor
                .map(format_date)
                .unwrap_or_else(|| "unset".to_string())
        );
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if !summary.days_quarantined.is_empty() {
            println!("⚠️  Unprocessed dates:");
            for date in &summary.days_quarantined {
                println!("  - {}", format_date(*date));
            }
            println!();
        }

        if summary.task_failures > 0 || summary.checkpoint_failures > 0 {
            println!("⚠️  Errors encountered:");
            println!("  Task failures: {}", summary.task_failures);
            println!("  Checkpoint write failures: {}", summary.checkpoint_failures);
            println!();
        }

        if summary.interrupted {
            println!("⚠️  Harvest interrupted gracefully. Progress saved.");
            println!("   Run the same command to resume from the cursor.");
        } else if let Some(date) = summary.halted_on {
            println!("❌ Harvest halted: {} could not be fetched", format_date(date));
            println!("   The cursor was left on the previous day.");
        } else if summary.is_successful() {
            println!("✅ Harvest completed successfully!");
        } else {
            println!("⚠️  Harvest completed with quarantined records");
        }
        println!();
    }
}

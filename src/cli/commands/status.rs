//! Status command implementation
//!
//! This module implements the `status` command, which prints the persisted
//! cursor and the two quarantine sets.

use crate::adapters::checkpoint::RedisCheckpointStore;
use crate::config::load_config_unchecked;
use crate::core::harvest::summary::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_SUCCESS};
use crate::core::state::StateManager;
use crate::domain::calendar::{format_date, next_day};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Maximum number of quarantined entries to list per set (0 = all)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking harvest status");

        println!("📊 Harvest Status");
        println!();

        // Only the checkpoint section matters here
        let config = match load_config_unchecked(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let store = match RedisCheckpointStore::connect(&config.checkpoint).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to checkpoint store");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let state_manager = StateManager::new_with_storage(Arc::new(store));

        let snapshot = match state_manager.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to read checkpoint state");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        match snapshot.cursor {
            Some(cursor) => {
                println!("Cursor: {}", format_date(cursor));
                println!("Next day: {}", format_date(next_day(cursor)));
            }
            None => {
                println!("No harvest history found.");
                println!("Run 'harvester harvest' to start harvesting.");
            }
        }
        println!();

        self.print_set("Unprocessed dates", &snapshot.unprocessed_dates);
        self.print_set("Invalid encounters", &snapshot.invalid_encounters);

        Ok(EXIT_SUCCESS)
    }

    fn print_set(&self, title: &str, members: &[String]) {
        println!("{title}: {}", members.len());

        let shown = if self.limit == 0 {
            members.len()
        } else {
            self.limit.min(members.len())
        };

        for member in &members[..shown] {
            println!("  - {member}");
        }
        if shown < members.len() {
            println!("  ... and {} more", members.len() - shown);
        }
        println!();
    }
}

//! Core business logic for the harvester.
//!
//! # Modules
//!
//! - [`fetch`] - Retry with exponential backoff
//! - [`state`] - Cursor and quarantine persistence
//! - [`resolve`] - Practitioner and patient reference resolution
//! - [`pipeline`] - Per-record validation, enrichment and publishing
//! - [`publish`] - Message encoding and content digest
//! - [`harvest`] - The day-by-day cursor loop and run summary
//!
//! # Harvest Workflow
//!
//! 1. **Resume**: read the cursor, or fall back to the configured start date
//! 2. **Fetch**: GET the day's encounters, retrying with backoff
//! 3. **Fan out**: one task per entry, lane chosen by position
//! 4. **Enrich**: validate, resolve practitioner and patient, publish
//! 5. **Quarantine**: anything that fails lands in `invalid_encounters`
//! 6. **Checkpoint**: persist the day once every task has finished
//!
//! # Example
//!
//! ```rust,no_run
//! use harvester::config::load_config;
//! use harvester::core::harvest::HarvestCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("harvester.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = HarvestCoordinator::connect(&config, shutdown_rx).await?;
//! let summary = coordinator.run().await?;
//!
//! println!("Published: {}", summary.published);
//! println!("Quarantined: {}", summary.quarantined);
//! # Ok(())
//! # }
//! ```

pub mod fetch;
pub mod harvest;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod state;

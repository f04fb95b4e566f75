// Harvester - Resumable FHIR Encounter Harvester
// Copyright (c) 2025 Harvester Contributors
// Licensed under the MIT License

//! # Harvester - Resumable FHIR Encounter Harvester
//!
//! Harvester walks a calendar window one day at a time, pulls the day's
//! `Encounter` resources from a FHIR R4 server, resolves each encounter's
//! practitioner and patient, and publishes one enriched message per encounter
//! to an SQS FIFO queue.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Fetching** daily encounter bundles with retry and exponential backoff
//! - **Enriching** encounters with their practitioner and patient
//! - **Publishing** messages to ordering lanes chosen by position within a day
//! - **Checkpointing** a date cursor in Redis/Valkey so a restart resumes where
//!   the last run stopped
//! - **Quarantining** dates and encounters that could not be processed
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (harvest loop, pipeline, resolution, state)
//! - [`adapters`] - External integrations (FHIR, Redis, SQS)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harvester::config::load_config;
//! use harvester::core::harvest::HarvestCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("harvester.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = HarvestCoordinator::connect(&config, shutdown_rx).await?;
//!     let summary = coordinator.run().await?;
//!
//!     println!("Published {} encounters", summary.published);
//!     std::process::exit(summary.exit_code());
//! }
//! ```
//!
//! ## Resuming
//!
//! The cursor (`last_processed_date`) names the last day whose batch was
//! fetched and whose record tasks all finished. A new run starts on the day
//! after it, never before the configured start date:
//!
//! ```rust,no_run
//! use harvester::adapters::checkpoint::InMemoryCheckpointStore;
//! use harvester::core::state::StateManager;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = StateManager::new_with_storage(Arc::new(InMemoryCheckpointStore::new()));
//!
//! if let Some(cursor) = state.load_cursor().await? {
//!     println!("Last processed: {cursor}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::HarvestError`]. Per-record failures
//! never abort a day; they are recorded in the `invalid_encounters` set instead.
//!
//! ## Logging
//!
//! Harvester uses structured logging with the `tracing` crate. File logs are
//! JSON, one file per day, named `collector.YYYY-MM-DD.log`.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

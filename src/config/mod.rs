//! Configuration management for the harvester.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! The harvester reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `HARVESTER_<SECTION>_<KEY>` overrides
//! - The deployment variables `START_DATE`, `END_DATE`, `VALKEY_URI` and `SQS_QUEUE_URL`
//! - Default values for optional settings
//! - Running from the environment alone when the default file is absent
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use harvester::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("harvester.toml")?;
//!
//! println!("Source: {}", config.source.base_url);
//! println!("Window: {} .. {}", config.harvest.start_date, config.harvest.end_date);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`SourceConfig`] - FHIR server, timeout and [`RetryConfig`]
//! - [`HarvestConfig`] - Date window, ordering lanes and fan-out
//! - [`CheckpointConfig`] - Redis/Valkey checkpoint store
//! - [`QueueConfig`] - SQS FIFO queue
//! - [`LoggingConfig`] - Rolling file logs
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! base_url = "https://hapi.fhir.org/baseR4"
//!
//! [harvest]
//! start_date = "2025-01-01"
//! end_date = "2025-01-31"
//!
//! [checkpoint]
//! url = "redis://valkey:6379"
//!
//! [queue]
//! queue_url = "${SQS_QUEUE_URL}"
//! endpoint_url = "http://localstack:4566"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{
    load_config, load_config_unchecked, load_config_with, parse_config, DEFAULT_CONFIG_PATH,
};
pub use schema::{
    ApplicationConfig, BatchFailurePolicy, CheckpointConfig, HarvestConfig, HarvesterConfig,
    LoggingConfig, QueueConfig, RetryConfig, SourceConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};

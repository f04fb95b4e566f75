//! External system integrations for the harvester.
//!
//! - [`fhir`] - FHIR R4 source (HTTP, timeout, retry)
//! - [`checkpoint`] - Durable cursor and quarantine sets (Redis / Valkey)
//! - [`queue`] - Ordered downstream queue (SQS FIFO)
//!
//! # Design Pattern
//!
//! The checkpoint store and the queue sit behind traits so the harvest loop
//! can run against in-process implementations for dry runs and tests.
//!
//! ```rust,no_run
//! use harvester::adapters::checkpoint::{CheckpointStore, RedisCheckpointStore};
//! use harvester::config::CheckpointConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CheckpointConfig {
//!     url: "valkey:6379".to_string(),
//!     ..Default::default()
//! };
//! let store = RedisCheckpointStore::connect(&config).await?;
//! let cursor = store.get("last_processed_date").await?;
//! println!("cursor: {cursor:?}");
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod fhir;
pub mod queue;

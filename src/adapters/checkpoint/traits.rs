//! Checkpoint store abstraction
//!
//! The harvester persists three things between runs: a string value for the
//! cursor and two string sets for quarantined items. Any key-value store that
//! offers those two shapes can back it.

use crate::domain::Result;
use async_trait::async_trait;

/// Durable key-value store holding the cursor and the quarantine sets
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read a string value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a string value
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Add a member to a set; adding an existing member is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

//! State manager for cursor and quarantine persistence
//!
//! Translates harvest-level operations (load the cursor, checkpoint a day,
//! quarantine a date or an encounter) into reads and writes on a
//! [`CheckpointStore`].

use crate::adapters::checkpoint::CheckpointStore;
use crate::domain::calendar::{format_date, parse_date};
use crate::domain::{HarvestError, Result};
use chrono::NaiveDate;
use std::sync::Arc;

/// Key holding the last successfully attempted day
pub const CURSOR_KEY: &str = "last_processed_date";

/// Set of days whose batch fetch exhausted its retries
pub const UNPROCESSED_DATES_KEY: &str = "unprocessed_dates";

/// Set of encounter URLs that could not be enriched or published
pub const INVALID_ENCOUNTERS_KEY: &str = "invalid_encounters";

/// Snapshot of everything the harvester has persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub cursor: Option<NaiveDate>,
    pub unprocessed_dates: Vec<String>,
    pub invalid_encounters: Vec<String>,
}

/// State manager for the cursor and the quarantine sets
///
/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct StateManager {
    storage: Arc<dyn CheckpointStore>,
}

impl StateManager {
    /// Create a new StateManager over a checkpoint store
    pub fn new_with_storage(storage: Arc<dyn CheckpointStore>) -> Self {
        Self { storage }
    }

    /// Backend name of the underlying store
    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }

    /// Load the persisted cursor
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` on a fresh start.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or holds a value that is
    /// not a `YYYY-MM-DD` date.
    pub async fn load_cursor(&self) -> Result<Option<NaiveDate>> {
        match self.storage.get(CURSOR_KEY).await? {
            None => Ok(None),
            Some(raw) => parse_date(&raw).map(Some).map_err(|e| {
                HarvestError::Checkpoint(format!("Stored {CURSOR_KEY} is not a date: {e}"))
            }),
        }
    }

    /// Persist `date` as the last attempted day
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn checkpoint_day(&self, date: NaiveDate) -> Result<()> {
        let value = format_date(date);
        tracing::info!(cursor = %value, "Checkpointing day");
        self.storage.set(CURSOR_KEY, &value).await
    }

    /// Record a day whose batch could not be fetched
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn quarantine_date(&self, date: NaiveDate) -> Result<()> {
        let value = format_date(date);
        self.storage.add_to_set(UNPROCESSED_DATES_KEY, &value).await
    }

    /// Record an encounter that could not be enriched or published
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn quarantine_encounter(&self, full_url: &str) -> Result<()> {
        self.storage
            .add_to_set(INVALID_ENCOUNTERS_KEY, full_url)
            .await
    }

    /// Days currently quarantined
    pub async fn unprocessed_dates(&self) -> Result<Vec<String>> {
        self.storage.members(UNPROCESSED_DATES_KEY).await
    }

    /// Encounter URLs currently quarantined
    pub async fn invalid_encounters(&self) -> Result<Vec<String>> {
        self.storage.members(INVALID_ENCOUNTERS_KEY).await
    }

    /// Read the cursor and both quarantine sets
    ///
    /// # Errors
    ///
    /// Returns the first read error encountered.
    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        Ok(StateSnapshot {
            cursor: self.load_cursor().await?,
            unprocessed_dates: self.unprocessed_dates().await?,
            invalid_encounters: self.invalid_encounters().await?,
        })
    }
}

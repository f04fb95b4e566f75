//! Configuration schema types
//!
//! This module defines the configuration structure for the harvester.

use crate::config::SecretString;
use crate::domain::calendar::parse_date;
use crate::domain::GroupKeys;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Main harvester configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvesterConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Upstream FHIR source
    #[serde(default)]
    pub source: SourceConfig,

    /// Harvest window and fan-out settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Checkpoint store (Redis / Valkey)
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Downstream ordered queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarvesterConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate()?;
        self.harvest.validate()?;
        self.checkpoint.validate()?;
        self.queue.validate(self.application.dry_run)?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (in-memory checkpoints, nothing sent to the queue)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Retry configuration shared by batch and reference fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per logical fetch, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay after the first failed attempt, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(format!(
                "source.retry.max_attempts must be between 1 and 10, got {}",
                self.max_attempts
            ));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "source.retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err("source.retry.max_delay_ms must be >= initial_delay_ms".to_string());
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Upstream FHIR source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the FHIR server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Pages fetched per day; more than one follows the bundle's `next` link
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// TLS certificate verification enabled
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("source.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("source.base_url must start with http:// or https://".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("source.timeout_seconds must be > 0".to_string());
        }

        if self.max_pages == 0 {
            return Err("source.max_pages must be >= 1".to_string());
        }

        self.retry.validate()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_pages: default_max_pages(),
            tls_verify: true,
            retry: RetryConfig::default(),
        }
    }
}

/// What the cursor loop does when a day's batch cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailurePolicy {
    /// Quarantine the date and end the run; the cursor stays put
    #[default]
    Halt,
    /// Quarantine the date and move on without checkpointing it
    Skip,
}

/// Harvest window and fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// First day to harvest (YYYY-MM-DD)
    #[serde(default)]
    pub start_date: String,

    /// Last day to harvest, inclusive (YYYY-MM-DD)
    #[serde(default)]
    pub end_date: String,

    /// Ordering lanes assigned by entry position
    #[serde(default = "default_group_keys")]
    pub group_keys: Vec<String>,

    /// Maximum records in flight per day (0 = unbounded)
    #[serde(default)]
    pub max_concurrency: usize,

    /// Quarantine encounters whose first participant has no reference
    #[serde(default = "default_true")]
    pub strict_references: bool,

    /// Behaviour when a day's batch fetch is exhausted
    #[serde(default)]
    pub on_batch_failure: BatchFailurePolicy,
}

impl HarvestConfig {
    /// Parsed `(start, end)` window
    ///
    /// # Errors
    ///
    /// Returns an error if either date is missing or malformed, or if the
    /// window is inverted
    pub fn window(&self) -> Result<(NaiveDate, NaiveDate), String> {
        if self.start_date.trim().is_empty() {
            return Err("harvest.start_date is required".to_string());
        }
        if self.end_date.trim().is_empty() {
            return Err("harvest.end_date is required".to_string());
        }

        let start = parse_date(&self.start_date).map_err(|e| format!("harvest.start_date: {e}"))?;
        let end = parse_date(&self.end_date).map_err(|e| format!("harvest.end_date: {e}"))?;

        if end < start {
            return Err(format!(
                "harvest.end_date ({end}) must not precede harvest.start_date ({start})"
            ));
        }

        Ok((start, end))
    }

    /// Parsed ordering lanes
    pub fn lanes(&self) -> Result<GroupKeys, String> {
        GroupKeys::new(self.group_keys.iter().cloned())
            .map_err(|e| format!("harvest.group_keys: {e}"))
    }

    fn validate(&self) -> Result<(), String> {
        self.window()?;
        self.lanes()?;
        Ok(())
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_date: String::new(),
            end_date: String::new(),
            group_keys: default_group_keys(),
            max_concurrency: 0,
            strict_references: true,
            on_batch_failure: BatchFailurePolicy::default(),
        }
    }
}

/// Checkpoint store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Redis/Valkey URL; a bare `host:port` is accepted
    #[serde(default = "default_checkpoint_url")]
    pub url: String,

    /// Optional password
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Prefix applied to every key the harvester touches
    #[serde(default)]
    pub key_prefix: String,
}

impl CheckpointConfig {
    /// URL with a `redis://` scheme added when the value is a bare address
    pub fn connection_url(&self) -> String {
        if self.url.contains("://") {
            self.url.clone()
        } else {
            format!("redis://{}", self.url)
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("checkpoint.url cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            url: default_checkpoint_url(),
            password: None,
            key_prefix: String::new(),
        }
    }
}

/// Downstream queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// FIFO queue URL
    #[serde(default)]
    pub queue_url: String,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint override (e.g. LocalStack)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Static access key id (default credential chain when absent)
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Static secret access key
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub secret_access_key: Option<SecretString>,

    /// Queue has content-based deduplication enabled; when false the
    /// publisher supplies a content digest as the deduplication id
    #[serde(default)]
    pub content_based_deduplication: bool,
}

impl QueueConfig {
    fn validate(&self, dry_run: bool) -> Result<(), String> {
        if self.queue_url.trim().is_empty() && !dry_run {
            return Err("queue.queue_url is required".to_string());
        }

        if self.region.trim().is_empty() {
            return Err("queue.region cannot be empty".to_string());
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(
                "queue.access_key_id and queue.secret_access_key must be set together".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            region: default_region(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            content_based_deduplication: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rotated files kept on disk
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.max_files == 0 {
            return Err("logging.max_files must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            max_files: default_max_files(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://hapi.fhir.org/baseR4".to_string()
}

fn default_timeout_seconds() -> u64 {
    20
}

fn default_max_pages() -> usize {
    1
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    60000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_group_keys() -> Vec<String> {
    vec!["001".to_string(), "002".to_string()]
}

fn default_checkpoint_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_region() -> String {
    "sa-east-1".to_string()
}

fn default_local_path() -> String {
    "/app/logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_max_files() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use test_case::test_case;

    fn harvest_config(start: &str, end: &str) -> HarvestConfig {
        HarvestConfig {
            start_date: start.to_string(),
            end_date: end.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_harvest_window() {
        let config = harvest_config("2025-01-01", "2025-01-31");
        let (start, end) = config.window().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    }

    #[test_case("", "2025-01-31", "start_date is required" ; "missing start")]
    #[test_case("2025-01-01", "", "end_date is required" ; "missing end")]
    #[test_case("01/01/2025", "2025-01-31", "harvest.start_date" ; "malformed start")]
    #[test_case("2025-01-01", "2025-13-01", "harvest.end_date" ; "malformed end")]
    #[test_case("2025-02-01", "2025-01-01", "must not precede" ; "inverted window")]
    fn test_harvest_window_errors(start: &str, end: &str, expected: &str) {
        let err = harvest_config(start, end).window().unwrap_err();
        assert!(err.contains(expected), "unexpected error: {err}");
    }

    #[test]
    fn test_single_day_window_is_valid() {
        assert!(harvest_config("2025-01-01", "2025-01-01").validate().is_ok());
    }

    #[test]
    fn test_group_keys_validation() {
        let mut config = harvest_config("2025-01-01", "2025-01-02");
        assert_eq!(config.lanes().unwrap().len(), 2);

        config.group_keys = vec![];
        assert!(config.validate().is_err());

        config.group_keys = vec!["ok".to_string(), String::new()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_config_validation() {
        let mut config = SourceConfig::default();
        assert!(config.validate().is_ok());

        config.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        config.base_url = "http://localhost:8080/fhir".to_string();
        config.max_pages = 0;
        assert!(config.validate().is_err());

        config.max_pages = 1;
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        config.retry.max_attempts = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_delay_bounds() {
        let config = RetryConfig {
            initial_delay_ms: 5000,
            max_delay_ms: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_url_required_unless_dry_run() {
        let config = QueueConfig::default();
        assert!(config.validate(false).is_err());
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_queue_static_credentials_pairing() {
        let mut config = QueueConfig {
            queue_url: "http://localstack:4566/000000000000/encounters.fifo".to_string(),
            access_key_id: Some("test".to_string()),
            ..Default::default()
        };
        assert!(config.validate(false).is_err());

        config.secret_access_key = Some(secret_string("test".to_string()));
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_checkpoint_connection_url() {
        let mut config = CheckpointConfig {
            url: "valkey:6379".to_string(),
            ..Default::default()
        };
        assert_eq!(config.connection_url(), "redis://valkey:6379");

        config.url = "rediss://cache.example.org:6380/1".to_string();
        assert_eq!(config.connection_url(), "rediss://cache.example.org:6380/1");
    }

    #[test]
    fn test_batch_failure_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            on_batch_failure: BatchFailurePolicy,
        }

        let w: Wrapper = toml::from_str(r#"on_batch_failure = "skip""#).unwrap();
        assert_eq!(w.on_batch_failure, BatchFailurePolicy::Skip);
        assert_eq!(BatchFailurePolicy::default(), BatchFailurePolicy::Halt);
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.local_enabled);
        assert_eq!(config.local_path, "/app/logs");
        assert_eq!(config.local_rotation, "daily");
        assert_eq!(config.max_files, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_base_url(), "https://hapi.fhir.org/baseR4");
        assert_eq!(default_timeout_seconds(), 20);
        assert_eq!(default_max_attempts(), 3);
        assert_eq!(default_initial_delay_ms(), 2000);
        assert_eq!(default_group_keys(), vec!["001", "002"]);
    }
}

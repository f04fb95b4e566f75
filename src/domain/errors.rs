//! Domain error types
//!
//! This module defines the error hierarchy for the harvester.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main harvester error type
///
/// This is the primary error type used throughout the application.
/// Per-record failures (`Source`, `Validation`, `Publish`) are absorbed into
/// quarantine by the pipeline; `Configuration` is fatal at startup.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream FHIR source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Payload decoded but failed domain shape checks, or could not be decoded
    #[error("Validation error: {0}")]
    Validation(String),

    /// Downstream queue rejected the message
    #[error("Publish error: {0}")]
    Publish(String),

    /// Checkpoint store errors
    #[error("Checkpoint store error: {0}")]
    Checkpoint(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl HarvestError {
    /// Whether this error came from the upstream source after the retry
    /// budget was spent.
    pub fn is_terminal_fetch(&self) -> bool {
        matches!(
            self,
            HarvestError::Source(SourceError::RetriesExhausted { .. })
        )
    }
}

/// Upstream source errors
///
/// Every variant except `RetriesExhausted` describes a single attempt and is
/// retried inside the fetcher; only `RetriesExhausted` escapes it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the source API
    #[error("Failed to connect to source API: {0}")]
    ConnectionFailed(String),

    /// The request did not complete within the timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-2xx response
    #[error("Source API returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    InvalidBody(String),

    /// Retry budget exhausted
    #[error("All {attempts} attempts failed for {url}: {last}")]
    RetriesExhausted {
        url: String,
        attempts: usize,
        last: Box<SourceError>,
    },
}

// Conversion from std::io::Error
impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        HarvestError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for HarvestError {
    fn from(err: toml::de::Error) -> Self {
        HarvestError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<redis::RedisError> for HarvestError {
    fn from(err: redis::RedisError) -> Self {
        HarvestError::Checkpoint(err.to_string())
    }
}

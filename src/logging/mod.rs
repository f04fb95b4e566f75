//! Logging and observability
//!
//! Structured logging with:
//! - JSON-formatted file logs
//! - Configurable log levels (`RUST_LOG` wins when set)
//! - Daily or hourly rotation with a bounded number of kept files
//!
//! # Example
//!
//! ```no_run
//! use harvester::logging::init_logging;
//! use harvester::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Harvester started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard, LOG_FILE_PREFIX};

/// Log a retry attempt of an upstream fetch
///
/// # Example
///
/// ```no_run
/// use harvester::log_retry_attempt;
/// use std::time::Duration;
///
/// log_retry_attempt!("https://hapi.fhir.org/baseR4/Patient/1", 1, 3, Duration::from_secs(2), "timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($url:expr, $attempt:expr, $max_attempts:expr, $delay:expr, $reason:expr) => {
        tracing::warn!(
            url = %$url,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay.as_millis() as u64,
            reason = %$reason,
            "Fetch attempt failed, retrying with exponential backoff"
        );
    };
}

/// Log a quarantine decision
///
/// # Example
///
/// ```no_run
/// use harvester::log_quarantine;
///
/// log_quarantine!("invalid_encounters", "https://hapi.fhir.org/baseR4/Encounter/9", "missing status");
/// ```
#[macro_export]
macro_rules! log_quarantine {
    ($set:expr, $member:expr, $reason:expr) => {
        tracing::warn!(
            set = $set,
            member = %$member,
            reason = %$reason,
            "Quarantined"
        );
    };
}

/// Log the completion of one day
///
/// # Example
///
/// ```no_run
/// use harvester::log_day_complete;
/// use std::time::Duration;
///
/// log_day_complete!("2025-01-01", 10, 8, 2, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_day_complete {
    ($date:expr, $entries:expr, $published:expr, $quarantined:expr, $duration:expr) => {
        tracing::info!(
            date = %$date,
            entries = $entries,
            published = $published,
            quarantined = $quarantined,
            duration_ms = $duration.as_millis() as u64,
            "Day processed"
        );
    };
}

//! Harvest summary and reporting

use crate::core::pipeline::RecordOutcome;
use crate::domain::calendar::format_date;
use chrono::NaiveDate;
use std::time::Duration;

/// Exit code: every record published or skipped
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code: the window completed but something was quarantined
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code: configuration error
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: the run stopped on a date whose batch could not be fetched
pub const EXIT_HALTED: i32 = 3;
/// Exit code: checkpoint store or queue unreachable at startup
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code: unexpected fatal error
pub const EXIT_FATAL: i32 = 5;
/// Exit code: stopped by SIGINT/SIGTERM between days
pub const EXIT_INTERRUPTED: i32 = 130;

/// Summary of a harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    /// First day the run attempted
    pub resumed_at: Option<NaiveDate>,

    /// Days whose batch was fetched and fanned out
    pub days_processed: usize,

    /// Days added to `unprocessed_dates`
    pub days_quarantined: Vec<NaiveDate>,

    /// Entries seen across all fetched batches
    pub entries_seen: usize,

    /// Messages handed to the queue
    pub published: usize,

    /// Encounters added to `invalid_encounters`
    pub quarantined: usize,

    /// Encounters dropped without quarantine
    pub skipped: usize,

    /// Per-record tasks that did not run to completion
    pub task_failures: usize,

    /// Cursor writes that failed after a day completed
    pub checkpoint_failures: usize,

    /// Last cursor value written by this run
    pub cursor: Option<NaiveDate>,

    /// Date on which the run halted
    pub halted_on: Option<NaiveDate>,

    /// Whether a shutdown signal ended the run early
    pub interrupted: bool,

    /// Duration of the run
    pub duration: Duration,
}

impl HarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Tally one record outcome
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Published => self.published += 1,
            RecordOutcome::Quarantined => self.quarantined += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Nothing was quarantined and the run reached the end of its window
    pub fn is_successful(&self) -> bool {
        self.quarantined == 0
            && self.task_failures == 0
            && self.checkpoint_failures == 0
            && self.days_quarantined.is_empty()
            && self.halted_on.is_none()
            && !self.interrupted
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if self.halted_on.is_some() {
            EXIT_HALTED
        } else if self.is_successful() {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            days_processed = self.days_processed,
            days_quarantined = self.days_quarantined.len(),
            entries = self.entries_seen,
            published = self.published,
            quarantined = self.quarantined,
            skipped = self.skipped,
            cursor = self.cursor.map(format_date).unwrap_or_default(),
            duration_secs = self.duration.as_secs(),
            "Harvest completed"
        );

        if let Some(date) = self.halted_on {
            tracing::error!(
                date = %format_date(date),
                "Harvest halted on a date whose batch could not be fetched"
            );
        }

        if self.task_failures > 0 || self.checkpoint_failures > 0 {
            tracing::warn!(
                task_failures = self.task_failures,
                checkpoint_failures = self.checkpoint_failures,
                "Harvest completed with errors"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_creation() {
        let summary = HarvestSummary::new().with_duration(Duration::from_secs(120));

        assert_eq!(summary.days_processed, 0);
        assert_eq!(summary.duration, Duration::from_secs(120));
        assert!(summary.is_successful());
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_record_outcomes() {
        let mut summary = HarvestSummary::new();
        summary.record(RecordOutcome::Published);
        summary.record(RecordOutcome::Published);
        summary.record(RecordOutcome::Quarantined);
        summary.record(RecordOutcome::Skipped);

        assert_eq!(summary.published, 2);
        assert_eq!(summary.quarantined, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_exit_code_precedence() {
        let mut summary = HarvestSummary::new();
        summary.halted_on = NaiveDate::from_ymd_opt(2025, 1, 2);
        assert_eq!(summary.exit_code(), EXIT_HALTED);

        summary.interrupted = true;
        assert_eq!(summary.exit_code(), EXIT_INTERRUPTED);
    }

    #[test]
    fn test_skipped_days_are_partial() {
        let mut summary = HarvestSummary::new();
        summary
            .days_quarantined
            .push(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(summary.exit_code(), EXIT_PARTIAL);
    }
}

//! Harvest coordinator - the day-by-day cursor loop
//!
//! Runs one day at a time from the resumed (or configured) start date to the
//! end date. Each day's batch is fetched, fanned out to the enrichment
//! pipeline as independent tasks, and the cursor is written only after every
//! task of the day has finished.

use crate::adapters::checkpoint::{CheckpointStore, InMemoryCheckpointStore, RedisCheckpointStore};
use crate::adapters::fhir::{BundleEntry, FhirClient};
use crate::adapters::queue::{DryRunPublisher, MessagePublisher, SqsPublisher};
use crate::config::{BatchFailurePolicy, HarvestConfig, HarvesterConfig};
use crate::core::harvest::summary::HarvestSummary;
use crate::core::pipeline::enrichment::entry_label;
use crate::core::pipeline::{EncounterPipeline, RecordOutcome};
use crate::core::resolve::ReferenceResolver;
use crate::core::state::StateManager;
use crate::domain::calendar::{format_date, next_day};
use crate::domain::{GroupKeys, HarvestError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::{self, JoinSet};

/// Loop parameters derived from `[harvest]`
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lanes: GroupKeys,
    /// 0 means unbounded
    pub max_concurrency: usize,
    pub strict_references: bool,
    pub on_batch_failure: BatchFailurePolicy,
}

impl HarvestSettings {
    /// Parse and check the harvest section
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing, malformed or inverted
    /// window and for an invalid lane set.
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        let (start, end) = config.window().map_err(HarvestError::Configuration)?;
        let lanes = config.lanes().map_err(HarvestError::Configuration)?;

        Ok(Self {
            start,
            end,
            lanes,
            max_concurrency: config.max_concurrency,
            strict_references: config.strict_references,
            on_batch_failure: config.on_batch_failure,
        })
    }
}

/// States of the cursor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Resuming,
    ProcessingDay(NaiveDate),
    Advancing(NaiveDate),
    Done,
}

/// Harvest coordinator
pub struct HarvestCoordinator {
    settings: HarvestSettings,
    client: Arc<FhirClient>,
    pipeline: EncounterPipeline,
    state: StateManager,
    shutdown: watch::Receiver<bool>,
}

impl HarvestCoordinator {
    /// Assemble a coordinator from already-built collaborators
    pub fn new(
        settings: HarvestSettings,
        client: Arc<FhirClient>,
        state: StateManager,
        publisher: Arc<dyn MessagePublisher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let pipeline = EncounterPipeline::new(
            ReferenceResolver::new(client.clone()),
            publisher,
            state.clone(),
            settings.strict_references,
        );

        Self {
            settings,
            client,
            pipeline,
            state,
            shutdown,
        }
    }

    /// Build every collaborator from configuration
    ///
    /// Dry runs use an in-process checkpoint store and a log-only publisher;
    /// otherwise Redis and SQS are connected here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings and a checkpoint
    /// error when the store cannot be reached.
    pub async fn connect(config: &HarvesterConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let settings = HarvestSettings::from_config(&config.harvest)?;
        let client = Arc::new(FhirClient::new(&config.source)?);

        let (store, publisher): (Arc<dyn CheckpointStore>, Arc<dyn MessagePublisher>) =
            if config.application.dry_run {
                tracing::warn!("Dry run: checkpoints kept in memory, messages not sent");
                (
                    Arc::new(InMemoryCheckpointStore::new()),
                    Arc::new(DryRunPublisher::log_only()),
                )
            } else {
                (
                    Arc::new(RedisCheckpointStore::connect(&config.checkpoint).await?),
                    Arc::new(SqsPublisher::new(&config.queue).await?),
                )
            };

        Ok(Self::new(
            settings,
            client,
            StateManager::new_with_storage(store),
            publisher,
            shutdown,
        ))
    }

    /// Run the loop until the window is exhausted, the run halts or a
    /// shutdown is requested
    ///
    /// # Errors
    ///
    /// Returns an error only when the cursor cannot be read at startup.
    /// Failures after that are recorded in the summary.
    pub async fn run(&self) -> Result<HarvestSummary> {
        let started = Instant::now();
        let mut summary = HarvestSummary::new();
        let mut state = LoopState::Resuming;

        tracing::info!(
            start = %format_date(self.settings.start),
            end = %format_date(self.settings.end),
            lanes = self.settings.lanes.len(),
            backend = self.state.backend_name(),
            "Starting harvest"
        );

        loop {
            state = match state {
                LoopState::Resuming => {
                    let first = self.resume_date().await?;
                    summary.resumed_at = Some(first);
                    LoopState::ProcessingDay(first)
                }
                LoopState::ProcessingDay(date) if date > self.settings.end => LoopState::Done,
                LoopState::ProcessingDay(date) => {
                    if *self.shutdown.borrow() {
                        tracing::info!(
                            next_date = %format_date(date),
                            "Shutdown requested, stopping before next day"
                        );
                        summary.interrupted = true;
                        LoopState::Done
                    } else {
                        self.process_day(date, &mut summary).await
                    }
                }
                LoopState::Advancing(date) => {
                    match self.state.checkpoint_day(date).await {
                        Ok(()) => summary.cursor = Some(date),
                        Err(e) => {
                            summary.checkpoint_failures += 1;
                            tracing::error!(
                                date = %format_date(date),
                                error = %e,
                                "Failed to persist cursor; continuing"
                            );
                        }
                    }
                    if date >= self.settings.end {
                        LoopState::Done
                    } else {
                        LoopState::ProcessingDay(next_day(date))
                    }
                }
                LoopState::Done => break,
            };
        }

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// First day to process: the day after the persisted cursor, never
    /// earlier than the configured start
    async fn resume_date(&self) -> Result<NaiveDate> {
        match self.state.load_cursor().await? {
            Some(cursor) => {
                let resumed = next_day(cursor).max(self.settings.start);
                tracing::info!(
                    cursor = %format_date(cursor),
                    resume_at = %format_date(resumed),
                    "Resuming from persisted cursor"
                );
                Ok(resumed)
            }
            None => {
                tracing::info!(
                    start = %format_date(self.settings.start),
                    "No persisted cursor, starting at configured start date"
                );
                Ok(self.settings.start)
            }
        }
    }

    /// Fetch and fan out one day; returns the next loop state
    async fn process_day(&self, date: NaiveDate, summary: &mut HarvestSummary) -> LoopState {
        let day_started = Instant::now();

        let batch = match self.client.fetch_day(date).await {
            Ok(batch) => batch,
            Err(e) => return self.batch_failed(date, e, summary).await,
        };

        let entry_count = batch.entries.len();
        let outcomes = self.fan_out(batch.entries, summary).await;

        let published = outcomes
            .iter()
            .filter(|o| **o == RecordOutcome::Published)
            .count();
        let quarantined = outcomes
            .iter()
            .filter(|o| **o == RecordOutcome::Quarantined)
            .count();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary.days_processed += 1;
        summary.entries_seen += entry_count;

        crate::log_day_complete!(
            format_date(date),
            entry_count,
            published,
            quarantined,
            day_started.elapsed()
        );

        LoopState::Advancing(date)
    }

    /// Run every entry of the day as its own task and wait for all of them
    ///
    /// A task that panics or is cancelled has its entry quarantined so the
    /// cursor never moves past an unaccounted record.
    async fn fan_out(
        &self,
        entries: Vec<BundleEntry>,
        summary: &mut HarvestSummary,
    ) -> Vec<RecordOutcome> {
        let limiter = (self.settings.max_concurrency > 0)
            .then(|| Arc::new(Semaphore::new(self.settings.max_concurrency)));
        let mut tasks = JoinSet::new();
        let mut labels: HashMap<task::Id, String> = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let group_key = self.settings.lanes.for_position(position).clone();
            let limiter = limiter.clone();
            let label = entry_label(&entry);

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                pipeline.process(&entry, group_key).await
            });
            labels.insert(handle.id(), label);
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(e) => {
                    summary.task_failures += 1;
                    tracing::error!(error = %e, "Record task did not complete");

                    let label = labels
                        .remove(&e.id())
                        .unwrap_or_else(|| "Encounter/<unidentified>".to_string());
                    let reason = format!("record task did not complete: {e}");
                    outcomes.push(self.pipeline.quarantine(&label, reason).await);
                }
            }
        }
        outcomes
    }

    /// Quarantine a day whose batch could not be fetched and apply the policy
    async fn batch_failed(
        &self,
        date: NaiveDate,
        error: HarvestError,
        summary: &mut HarvestSummary,
    ) -> LoopState {
        let day = format_date(date);
        tracing::error!(date = %day, error = %error, "Batch fetch failed");
        crate::log_quarantine!(crate::core::state::UNPROCESSED_DATES_KEY, day, error);

        if let Err(e) = self.state.quarantine_date(date).await {
            tracing::error!(date = %day, error = %e, "Failed to record unprocessed date");
        }
        summary.days_quarantined.push(date);

        match self.settings.on_batch_failure {
            BatchFailurePolicy::Halt => {
                summary.halted_on = Some(date);
                LoopState::Done
            }
            BatchFailurePolicy::Skip if date >= self.settings.end => LoopState::Done,
            BatchFailurePolicy::Skip => LoopState::ProcessingDay(next_day(date)),
        }
    }
}

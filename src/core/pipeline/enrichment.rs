//! Encounter enrichment pipeline
//!
//! Takes one raw batch entry through decode, validation, reference
//! resolution, assembly and publishing. Every failure is absorbed into the
//! `invalid_encounters` quarantine set; nothing escapes to sibling records.

use crate::adapters::fhir::models::{BundleEntry, EncounterResource};
use crate::adapters::queue::MessagePublisher;
use crate::core::publish::OutboundMessage;
use crate::core::resolve::ReferenceResolver;
use crate::core::state::{StateManager, INVALID_ENCOUNTERS_KEY};
use crate::domain::{EncounterCandidate, EnrichedMessage, GroupKey};
use std::fmt::Display;
use std::sync::Arc;

/// Terminal state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Exactly one message was handed to the queue
    Published,
    /// The record's URL was added to `invalid_encounters`
    Quarantined,
    /// Dropped without quarantine (lenient reference handling)
    Skipped,
}

/// Per-record enrichment pipeline
///
/// Cheap to clone; clones share the resolver, publisher and state.
#[derive(Clone)]
pub struct EncounterPipeline {
    resolver: ReferenceResolver,
    publisher: Arc<dyn MessagePublisher>,
    state: StateManager,
    strict_references: bool,
}

impl EncounterPipeline {
    /// Create a pipeline
    ///
    /// With `strict_references` a candidate whose first participant or
    /// subject carries no usable reference is quarantined; otherwise it is
    /// logged and skipped.
    pub fn new(
        resolver: ReferenceResolver,
        publisher: Arc<dyn MessagePublisher>,
        state: StateManager,
        strict_references: bool,
    ) -> Self {
        Self {
            resolver,
            publisher,
            state,
            strict_references,
        }
    }

    /// Process one batch entry on the lane `group_key`
    pub async fn process(&self, entry: &BundleEntry, group_key: GroupKey) -> RecordOutcome {
        let resource = match EncounterResource::from_entry(entry) {
            Ok(resource) => resource,
            Err(reason) => {
                return self
                    .quarantine(&quarantine_label(&entry.full_url, ""), reason)
                    .await
            }
        };

        let candidate = resource.into_candidate(&entry.full_url);
        let label = quarantine_label(&candidate.full_url, &candidate.id);

        // No fetch happens for a candidate that fails validation
        if let Err(e) = candidate.validate() {
            return self.quarantine(&label, e).await;
        }

        self.enrich_and_publish(&candidate, &label, group_key).await
    }

    async fn enrich_and_publish(
        &self,
        candidate: &EncounterCandidate,
        label: &str,
        group_key: GroupKey,
    ) -> RecordOutcome {
        let Some(practitioner_ref) = candidate.practitioner_reference() else {
            return self
                .missing_reference(label, "first participant has no practitioner reference")
                .await;
        };
        let Some(patient_ref) = candidate.patient_reference() else {
            return self
                .missing_reference(label, "subject has no patient reference")
                .await;
        };

        let practitioner = match self.resolver.resolve_practitioner(&practitioner_ref).await {
            Ok(p) => p,
            Err(e) => return self.quarantine(label, e).await,
        };
        let patient = match self.resolver.resolve_patient(&patient_ref).await {
            Ok(p) => p,
            Err(e) => return self.quarantine(label, e).await,
        };

        let message = EnrichedMessage::assemble(
            candidate,
            &practitioner_ref,
            &patient_ref,
            practitioner,
            patient,
        );

        let outbound = match OutboundMessage::encode(&message, group_key) {
            Ok(m) => m,
            Err(e) => return self.quarantine(label, e).await,
        };

        match self.publisher.publish(&outbound).await {
            Ok(()) => {
                tracing::info!(
                    encounter = %label,
                    group_key = %outbound.group_key(),
                    backend = self.publisher.backend_name(),
                    "Published enriched encounter"
                );
                RecordOutcome::Published
            }
            Err(e) => self.quarantine(label, e).await,
        }
    }

    async fn missing_reference(&self, label: &str, reason: &str) -> RecordOutcome {
        if self.strict_references {
            self.quarantine(label, reason).await
        } else {
            tracing::warn!(encounter = %label, reason = reason, "Skipping encounter");
            RecordOutcome::Skipped
        }
    }

    /// Add `label` to `invalid_encounters`
    pub(crate) async fn quarantine(&self, label: &str, reason: impl Display) -> RecordOutcome {
        crate::log_quarantine!(INVALID_ENCOUNTERS_KEY, label, reason);

        if let Err(e) = self.state.quarantine_encounter(label).await {
            tracing::error!(
                encounter = %label,
                error = %e,
                "Failed to record quarantined encounter"
            );
        }
        RecordOutcome::Quarantined
    }
}

/// Quarantine label of a raw entry, available before it is decoded
pub(crate) fn entry_label(entry: &BundleEntry) -> String {
    let id = entry
        .resource
        .get("id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    quarantine_label(&entry.full_url, id)
}

/// Identifier recorded in `invalid_encounters`: the entry URL, or
/// `Encounter/<id>` when the entry carries no URL
fn quarantine_label(full_url: &str, id: &str) -> String {
    if !full_url.trim().is_empty() {
        full_url.to_string()
    } else if !id.trim().is_empty() {
        format!("Encounter/{id}")
    } else {
        "Encounter/<unidentified>".to_string()
    }
}

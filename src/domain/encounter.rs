//! Encounter candidate domain model
//!
//! An `EncounterCandidate` is one entry of a day's batch after decoding but
//! before validation. Only candidates carrying every required field proceed
//! to reference resolution.

use super::errors::HarvestError;
use super::ids::ReferenceHandle;
use super::result::Result;
use serde::{Deserialize, Serialize};

/// Encounter period as reported by the source, kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Start of the encounter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// End of the encounter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// An encounter-like record awaiting validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterCandidate {
    /// Resource id on the source server
    pub id: String,

    /// Stable identifying URL of the batch entry
    pub full_url: String,

    /// Encounter status
    pub status: String,

    /// Encounter class code
    pub class_code: String,

    /// Encounter period
    pub period: Period,

    /// Participant individual references in source order (empty when a
    /// participant carries no reference)
    pub participant_references: Vec<String>,

    /// Subject (patient) reference
    pub subject_reference: String,
}

impl EncounterCandidate {
    /// Names of the required fields this candidate lacks
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.status.trim().is_empty() {
            missing.push("status");
        }
        if self.class_code.trim().is_empty() {
            missing.push("class.code");
        }
        if self.participant_references.is_empty() {
            missing.push("participant");
        }
        if self.subject_reference.trim().is_empty() {
            missing.push("subject.reference");
        }
        if self.full_url.trim().is_empty() {
            missing.push("fullUrl");
        }
        missing
    }

    /// Checks the required fields
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Validation` naming every missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarvestError::Validation(format!(
                "Encounter {} is missing required fields: {}",
                self.id,
                missing.join(", ")
            )))
        }
    }

    /// Practitioner reference taken from the first participant
    pub fn practitioner_reference(&self) -> Option<ReferenceHandle> {
        self.participant_references
            .first()
            .and_then(|r| ReferenceHandle::new(r.as_str()).ok())
    }

    /// Patient reference taken from the subject
    pub fn patient_reference(&self) -> Option<ReferenceHandle> {
        ReferenceHandle::new(self.subject_reference.as_str()).ok()
    }
}

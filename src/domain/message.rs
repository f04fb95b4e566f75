//! Enriched message domain model
//!
//! An `EnrichedMessage` is the composite forwarded downstream: the core
//! encounter attributes plus the resolved practitioner and patient. It is only
//! built once all three parts have passed validation, and is immutable after.

use super::encounter::{EncounterCandidate, Period};
use super::ids::ReferenceHandle;
use serde::{Deserialize, Serialize};

/// Core encounter attributes carried by a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRecord {
    /// Resource id on the source server
    pub fhir_id: String,
    /// Source URL of the batch entry
    pub full_url: String,
    pub status: String,
    /// Class code
    pub class: String,
    pub period: Period,
    /// Trailing id segment of the practitioner reference
    pub practitioner_id: String,
    /// Trailing id segment of the patient reference
    pub patient_id: String,
}

/// Practitioner resolved from the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPractitioner {
    pub fhir_id: String,
    pub given_name: String,
    pub family_name: String,
}

/// Patient resolved from the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPatient {
    pub fhir_id: String,
    pub given_name: String,
    pub family_name: String,
    pub birth_date: String,
    pub gender: String,
}

/// Composite message delivered to the downstream queue
///
/// # Examples
///
/// ```
/// use harvester::domain::{EncounterCandidate, EnrichedMessage, ResolvedPatient, ResolvedPractitioner};
///
/// let candidate = EncounterCandidate {
///     id: "enc-1".to_string(),
///     full_url: "http://fhir.example.org/Encounter/enc-1".to_string(),
///     status: "finished".to_string(),
///     class_code: "AMB".to_string(),
///     participant_references: vec!["Practitioner/pr-1".to_string()],
///     subject_reference: "Patient/pa-1".to_string(),
///     ..Default::default()
/// };
/// let practitioner = ResolvedPractitioner {
///     fhir_id: "pr-1".to_string(),
///     given_name: "Ana".to_string(),
///     family_name: "Silva".to_string(),
/// };
/// let patient = ResolvedPatient {
///     fhir_id: "pa-1".to_string(),
///     given_name: "João".to_string(),
///     family_name: "Souza".to_string(),
///     birth_date: "1980-05-01".to_string(),
///     gender: "male".to_string(),
/// };
///
/// let message = EnrichedMessage::assemble(
///     &candidate,
///     &candidate.practitioner_reference().unwrap(),
///     &candidate.patient_reference().unwrap(),
///     practitioner,
///     patient,
/// );
/// assert_eq!(message.encounter().practitioner_id, "pr-1");
/// assert_eq!(message.encounter().patient_id, "pa-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedMessage {
    encounter: EncounterRecord,
    practitioner: ResolvedPractitioner,
    patient: ResolvedPatient,
}

impl EnrichedMessage {
    /// Assembles a message from a validated candidate and its resolved references
    pub fn assemble(
        candidate: &EncounterCandidate,
        practitioner_ref: &ReferenceHandle,
        patient_ref: &ReferenceHandle,
        practitioner: ResolvedPractitioner,
        patient: ResolvedPatient,
    ) -> Self {
        Self {
            encounter: EncounterRecord {
                fhir_id: candidate.id.clone(),
                full_url: candidate.full_url.clone(),
                status: candidate.status.clone(),
                class: candidate.class_code.clone(),
                period: candidate.period.clone(),
                practitioner_id: practitioner_ref.id().to_string(),
                patient_id: patient_ref.id().to_string(),
            },
            practitioner,
            patient,
        }
    }

    /// Core encounter attributes
    pub fn encounter(&self) -> &EncounterRecord {
        &self.encounter
    }

    /// Resolved practitioner
    pub fn practitioner(&self) -> &ResolvedPractitioner {
        &self.practitioner
    }

    /// Resolved patient
    pub fn patient(&self) -> &ResolvedPatient {
        &self.patient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_names() {
        let candidate = EncounterCandidate {
            id: "enc-9".to_string(),
            full_url: "http://fhir.example.org/Encounter/enc-9".to_string(),
            status: "in-progress".to_string(),
            class_code: "EMER".to_string(),
            period: Period {
                start: Some("2025-01-01T10:00:00Z".to_string()),
                end: None,
            },
            participant_references: vec!["Practitioner/pr-9".to_string()],
            subject_reference: "Patient/pa-9".to_string(),
        };
        let message = EnrichedMessage::assemble(
            &candidate,
            &candidate.practitioner_reference().unwrap(),
            &candidate.patient_reference().unwrap(),
            ResolvedPractitioner {
                fhir_id: "pr-9".to_string(),
                given_name: "Maria".to_string(),
                family_name: "Costa".to_string(),
            },
            ResolvedPatient {
                fhir_id: "pa-9".to_string(),
                given_name: "Pedro".to_string(),
                family_name: "Lima".to_string(),
                birth_date: "1975-09-12".to_string(),
                gender: "male".to_string(),
            },
        );

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["encounter"]["fhirId"], "enc-9");
        assert_eq!(json["encounter"]["class"], "EMER");
        assert_eq!(json["encounter"]["period"]["start"], "2025-01-01T10:00:00Z");
        assert!(json["encounter"]["period"].get("end").is_none());
        assert_eq!(json["encounter"]["practitionerId"], "pr-9");
        assert_eq!(json["practitioner"]["givenName"], "Maria");
        assert_eq!(json["patient"]["birthDate"], "1975-09-12");
    }
}

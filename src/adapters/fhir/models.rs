//! FHIR R4 wire models
//!
//! Only the fields the harvester reads are modelled; everything else in the
//! upstream JSON is ignored. Absent fields decode to empty values so that
//! validation, not decoding, decides whether a record is usable.

use crate::domain::{EncounterCandidate, Period};
use serde::Deserialize;

/// Search result bundle
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,

    #[serde(default)]
    pub link: Vec<BundleLink>,
}

impl Bundle {
    /// URL of the next page, if the server advertises one
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
            .filter(|u| !u.is_empty())
    }
}

/// One entry of a bundle; the resource is kept raw and decoded per entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default)]
    pub full_url: String,

    #[serde(default)]
    pub resource: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleLink {
    #[serde(default)]
    pub relation: String,

    #[serde(default)]
    pub url: String,
}

/// Reference to another resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Coding {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncounterParticipant {
    #[serde(default)]
    pub individual: Option<Reference>,
}

/// Encounter resource
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterResource {
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub class: Option<Coding>,

    #[serde(default)]
    pub period: Option<Period>,

    #[serde(default)]
    pub participant: Vec<EncounterParticipant>,

    #[serde(default)]
    pub subject: Option<Reference>,
}

impl EncounterResource {
    /// Decodes a bundle entry's raw resource
    ///
    /// # Errors
    ///
    /// Returns a description when the JSON does not have the shape of an
    /// Encounter or declares another resource type.
    pub fn from_entry(entry: &BundleEntry) -> Result<Self, String> {
        let resource: EncounterResource = serde_json::from_value(entry.resource.clone())
            .map_err(|e| format!("undecodable encounter: {e}"))?;

        match resource.resource_type.as_deref() {
            Some("Encounter") | None => Ok(resource),
            Some(other) => Err(format!("expected Encounter, found {other}")),
        }
    }

    /// Flattens the resource into a candidate; absent fields become empty
    pub fn into_candidate(self, full_url: &str) -> EncounterCandidate {
        EncounterCandidate {
            id: self.id,
            full_url: full_url.to_string(),
            status: self.status.unwrap_or_default(),
            class_code: self.class.and_then(|c| c.code).unwrap_or_default(),
            period: self.period.unwrap_or_default(),
            participant_references: self
                .participant
                .into_iter()
                .map(|p| p.individual.and_then(|r| r.reference).unwrap_or_default())
                .collect(),
            subject_reference: self.subject.and_then(|r| r.reference).unwrap_or_default(),
        }
    }
}

/// Human name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumanName {
    #[serde(default)]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Vec<String>,
}

/// Given and family name of the first listed name, when a first given name exists
pub fn primary_name(names: &[HumanName]) -> Option<(String, String)> {
    let first = names.first()?;
    let given = first.given.first().filter(|g| !g.trim().is_empty())?;
    Some((given.clone(), first.family.clone().unwrap_or_default()))
}

/// Practitioner resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PractitionerResource {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: Vec<HumanName>,
}

/// Patient resource
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResource {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: Vec<HumanName>,

    #[serde(default)]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,
}

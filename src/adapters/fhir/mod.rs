//! FHIR R4 source adapter
//!
//! - [`client`] - HTTP client with timeout and retry
//! - [`models`] - Bundle, Encounter, Practitioner and Patient wire models

pub mod client;
pub mod models;

pub use client::{DayBatch, FhirClient};
pub use models::{Bundle, BundleEntry, EncounterResource, PatientResource, PractitionerResource};

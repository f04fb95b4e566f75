//! Reference resolution for practitioners and patients
//!
//! A reference is dereferenced through the fetcher, decoded into the
//! expected resource shape and checked against a minimal validity
//! predicate. Decode failures and validity failures are both reported as
//! `HarvestError::Validation`; fetch exhaustion stays a source error.

use crate::adapters::fhir::models::{primary_name, PatientResource, PractitionerResource};
use crate::adapters::fhir::FhirClient;
use crate::domain::{HarvestError, ReferenceHandle, ResolvedPatient, ResolvedPractitioner, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A resource kind the resolver knows how to validate
pub trait ResolvableEntity: DeserializeOwned {
    /// Resource kind used in log and error messages
    const KIND: &'static str;

    /// Validated, flattened form
    type Resolved;

    /// Applies the validity predicate
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated requirement.
    fn into_resolved(self) -> std::result::Result<Self::Resolved, String>;
}

impl ResolvableEntity for PractitionerResource {
    const KIND: &'static str = "Practitioner";
    type Resolved = ResolvedPractitioner;

    fn into_resolved(self) -> std::result::Result<Self::Resolved, String> {
        let (given_name, family_name) =
            primary_name(&self.name).ok_or_else(|| "no given name".to_string())?;
        Ok(ResolvedPractitioner {
            fhir_id: self.id,
            given_name,
            family_name,
        })
    }
}

impl ResolvableEntity for PatientResource {
    const KIND: &'static str = "Patient";
    type Resolved = ResolvedPatient;

    fn into_resolved(self) -> std::result::Result<Self::Resolved, String> {
        let (given_name, family_name) =
            primary_name(&self.name).ok_or_else(|| "no given name".to_string())?;
        Ok(ResolvedPatient {
            fhir_id: self.id,
            given_name,
            family_name,
            birth_date: self.birth_date.unwrap_or_default(),
            gender: self.gender.unwrap_or_default(),
        })
    }
}

/// Resolves reference handles against the FHIR source
#[derive(Clone)]
pub struct ReferenceResolver {
    client: Arc<FhirClient>,
}

impl ReferenceResolver {
    pub fn new(client: Arc<FhirClient>) -> Self {
        Self { client }
    }

    /// Fetch, decode and validate the entity behind `handle`
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Source` when the fetch is exhausted and
    /// `HarvestError::Validation` when the payload is malformed or invalid.
    pub async fn resolve<E: ResolvableEntity>(&self, handle: &ReferenceHandle) -> Result<E::Resolved> {
        let url = handle.dereference_url(self.client.base_url());
        let body = self.client.fetch(&url).await?;

        let entity: E = serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(kind = E::KIND, url = %url, error = %e, "Undecodable reference");
            HarvestError::Validation(format!("{} {} could not be decoded: {e}", E::KIND, handle))
        })?;

        entity.into_resolved().map_err(|reason| {
            tracing::debug!(kind = E::KIND, url = %url, reason = %reason, "Invalid reference");
            HarvestError::Validation(format!("{} {} is invalid: {reason}", E::KIND, handle))
        })
    }

    pub async fn resolve_practitioner(&self, handle: &ReferenceHandle) -> Result<ResolvedPractitioner> {
        self.resolve::<PractitionerResource>(handle).await
    }

    pub async fn resolve_patient(&self, handle: &ReferenceHandle) -> Result<ResolvedPatient> {
        self.resolve::<PatientResource>(handle).await
    }
}

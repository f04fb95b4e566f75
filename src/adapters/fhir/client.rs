//! HTTP client for the FHIR source
//!
//! Every GET issued by the harvester goes through [`FhirClient::fetch`], which
//! applies the per-request timeout and the retry policy. A non-2xx status is a
//! failed attempt just like a transport error.

use super::models::{Bundle, BundleEntry};
use crate::config::SourceConfig;
use crate::core::fetch::{retry_with_backoff, RetryPolicy};
use crate::domain::calendar::format_date;
use crate::domain::{HarvestError, Result, SourceError};
use chrono::NaiveDate;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use url::Url;

/// Encounters of one day, in source order across all fetched pages
#[derive(Debug, Clone, Default)]
pub struct DayBatch {
    pub entries: Vec<BundleEntry>,
    pub pages: usize,
}

/// FHIR source client
///
/// # Example
///
/// ```no_run
/// use harvester::adapters::fhir::FhirClient;
/// use harvester::config::SourceConfig;
/// use chrono::NaiveDate;
///
/// # async fn example() -> harvester::domain::Result<()> {
/// let client = FhirClient::new(&SourceConfig::default())?;
/// let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let batch = client.fetch_day(day).await?;
/// println!("{} encounters", batch.entries.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FhirClient {
    base_url: String,
    client: Client,
    retry: RetryPolicy,
    max_pages: usize,
}

impl FhirClient {
    /// Create a new client from the source configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("harvester/", env!("CARGO_PKG_VERSION")));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            HarvestError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::from(&config.retry),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Base URL references are dereferenced against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search URL for the encounters of `date`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is not a valid URL.
    pub fn encounters_url(&self, date: NaiveDate) -> Result<String> {
        let mut url = Url::parse(&format!("{}/Encounter", self.base_url)).map_err(|e| {
            HarvestError::Configuration(format!("Invalid source base URL {}: {e}", self.base_url))
        })?;
        url.query_pairs_mut()
            .append_pair("date", &format_date(date));
        Ok(url.to_string())
    }

    /// GET `url` under the retry policy and return the raw body
    ///
    /// # Errors
    ///
    /// Returns `SourceError::RetriesExhausted` once every attempt failed.
    pub async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, SourceError> {
        retry_with_backoff(&self.retry, url, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, SourceError> {
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/fhir+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(format!("{url}: {e}"))
                } else {
                    SourceError::ConnectionFailed(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(format!("{url}: {e}"))
            } else {
                SourceError::InvalidBody(format!("{url}: {e}"))
            }
        })?;

        Ok(body.to_vec())
    }

    /// Fetch every encounter entry for `date`
    ///
    /// Follows the bundle's `next` link for up to `max_pages` pages; each page
    /// is a separate logical fetch with its own retry budget.
    ///
    /// # Errors
    ///
    /// Returns a source error when a page cannot be fetched and a
    /// serialization error when a page is not a decodable bundle.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<DayBatch> {
        let mut next = Some(self.encounters_url(date)?);
        let mut batch = DayBatch::default();

        while let Some(url) = next.take() {
            let body = self.fetch(&url).await?;
            let bundle: Bundle = serde_json::from_slice(&body).map_err(|e| {
                HarvestError::Serialization(format!("Undecodable bundle from {url}: {e}"))
            })?;

            batch.pages += 1;
            batch.entries.extend(bundle.entry.iter().cloned());

            if batch.pages < self.max_pages {
                next = bundle
                    .next_link()
                    .map(|link| self.resolve_link(&url, link));
            } else if bundle.next_link().is_some() {
                tracing::debug!(
                    date = %date,
                    pages = batch.pages,
                    "Page limit reached, remaining pages not fetched"
                );
            }
        }

        tracing::debug!(
            date = %date,
            entries = batch.entries.len(),
            pages = batch.pages,
            "Fetched encounter batch"
        );

        Ok(batch)
    }

    fn resolve_link(&self, current: &str, link: &str) -> String {
        match Url::parse(current).and_then(|base| base.join(link)) {
            Ok(url) => url.to_string(),
            Err(_) => link.to_string(),
        }
    }
}

//! End-to-end tests of the day-by-day harvest loop
//!
//! These tests run the coordinator against a mock FHIR server with the
//! in-memory checkpoint store and the recording publisher, and verify:
//! - Published and quarantined records for a mixed day
//! - Cursor and `unprocessed_dates` after a failed batch
//! - Resuming never re-fetches an advanced day
//! - Lane assignment by position
//! - The skip policy and bounded fan-out
//! - A batch that succeeds after retries and an unresolvable patient

use harvester::adapters::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use harvester::adapters::fhir::FhirClient;
use harvester::adapters::queue::DryRunPublisher;
use harvester::config::{BatchFailurePolicy, HarvestConfig, RetryConfig, SourceConfig};
use harvester::core::harvest::{HarvestCoordinator, HarvestSettings};
use harvester::core::state::StateManager;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

fn settings(start: &str, end: &str, policy: BatchFailurePolicy) -> HarvestSettings {
    HarvestSettings::from_config(&HarvestConfig {
        start_date: start.to_string(),
        end_date: end.to_string(),
        on_batch_failure: policy,
        ..Default::default()
    })
    .unwrap()
}

fn coordinator(
    server: &ServerGuard,
    settings: HarvestSettings,
    store: Arc<InMemoryCheckpointStore>,
    publisher: Arc<DryRunPublisher>,
) -> HarvestCoordinator {
    let source = SourceConfig {
        base_url: server.url(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        },
        ..Default::default()
    };
    let (_tx, rx) = watch::channel(false);

    HarvestCoordinator::new(
        settings,
        Arc::new(FhirClient::new(&source).unwrap()),
        StateManager::new_with_storage(store),
        publisher,
        rx,
    )
}

fn encounter(id: &str) -> Value {
    json!({
        "fullUrl": format!("http://fhir.test/Encounter/{id}"),
        "resource": {
            "resourceType": "Encounter",
            "id": id,
            "status": "finished",
            "class": {"code": "AMB"},
            "period": {"start": "2025-01-01T08:00:00Z", "end": "2025-01-01T09:00:00Z"},
            "participant": [{"individual": {"reference": "Practitioner/p1"}}],
            "subject": {"reference": "Patient/x"}
        }
    })
}

fn bundle(entries: Vec<Value>) -> String {
    json!({"resourceType": "Bundle", "type": "searchset", "entry": entries}).to_string()
}

async fn mock_day(server: &mut ServerGuard, date: &str, body: String) -> Mock {
    server
        .mock("GET", "/Encounter")
        .match_query(Matcher::UrlEncoded("date".into(), date.into()))
        .with_status(200)
        .with_header("content-type", "application/fhir+json")
        .with_body(body)
        .create_async()
        .await
}

async fn mock_people(server: &mut ServerGuard) -> (Mock, Mock) {
    let practitioner = server
        .mock("GET", "/Practitioner/p1")
        .with_status(200)
        .with_body(
            r#"{"resourceType":"Practitioner","id":"p1","name":[{"family":"Silva","given":["Ana"]}]}"#,
        )
        .create_async()
        .await;
    let patient = server
        .mock("GET", "/Patient/x")
        .with_status(200)
        .with_body(
            r#"{"resourceType":"Patient","id":"x","name":[{"family":"Souza","given":["Jo"]}],"birthDate":"1980-05-01","gender":"male"}"#,
        )
        .create_async()
        .await;
    (practitioner, patient)
}

fn encounter_id(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    value["encounter"]["fhirId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_mixed_day_then_failed_batch_halts() {
    let mut server = mockito::Server::new_async().await;
    let _people = mock_people(&mut server).await;

    let mut missing_status = encounter("e2");
    missing_status["resource"]
        .as_object_mut()
        .unwrap()
        .remove("status");
    let day_one = mock_day(
        &mut server,
        "2025-01-01",
        bundle(vec![encounter("e1"), missing_status]),
    )
    .await;
    let day_two = server
        .mock("GET", "/Encounter")
        .match_query(Matcher::UrlEncoded("date".into(), "2025-01-02".into()))
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let store = Arc::new(InMemoryCheckpointStore::new());
    let publisher = Arc::new(DryRunPublisher::new());
    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-03", BatchFailurePolicy::Halt),
        store.clone(),
        publisher.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.days_processed, 1);
    assert_eq!(summary.entries_seen, 2);
    assert_eq!(summary.published, 1);
    assert_eq!(summary.quarantined, 1);
    assert_eq!(summary.halted_on.map(|d| d.to_string()).as_deref(), Some("2025-01-02"));
    assert_eq!(summary.exit_code(), 3);

    let sent = publisher.published();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].group_key().as_str(), "001");
    assert_eq!(encounter_id(sent[0].body()), "e1");

    assert_eq!(
        store.get("last_processed_date").await.unwrap().as_deref(),
        Some("2025-01-01")
    );
    assert_eq!(
        store.members("unprocessed_dates").await.unwrap(),
        vec!["2025-01-02"]
    );
    assert_eq!(
        store.members("invalid_encounters").await.unwrap(),
        vec!["http://fhir.test/Encounter/e2"]
    );

    day_one.assert_async().await;
    day_two.assert_async().await;
}

#[tokio::test]
async fn test_resume_never_refetches_advanced_day() {
    let store = Arc::new(InMemoryCheckpointStore::new());
    store.set("last_processed_date", "2025-01-01").await.unwrap();

    let mut server = mockito::Server::new_async().await;
    let day_one = server
        .mock("GET", "/Encounter")
        .match_query(Matcher::UrlEncoded("date".into(), "2025-01-01".into()))
        .expect(0)
        .create_async()
        .await;
    let day_two = mock_day(&mut server, "2025-01-02", bundle(vec![])).await;

    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-02", BatchFailurePolicy::Halt),
        store.clone(),
        Arc::new(DryRunPublisher::new()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(
        summary.resumed_at.map(|d| d.to_string()).as_deref(),
        Some("2025-01-02")
    );
    assert_eq!(summary.days_processed, 1);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        store.get("last_processed_date").await.unwrap().as_deref(),
        Some("2025-01-02")
    );

    day_one.assert_async().await;
    day_two.assert_async().await;
}

#[tokio::test]
async fn test_lanes_follow_position_parity() {
    let mut server = mockito::Server::new_async().await;
    let _people = mock_people(&mut server).await;
    let _day = mock_day(
        &mut server,
        "2025-01-01",
        bundle(vec![
            encounter("e0"),
            encounter("e1"),
            encounter("e2"),
            encounter("e3"),
        ]),
    )
    .await;

    let publisher = Arc::new(DryRunPublisher::new());
    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-01", BatchFailurePolicy::Halt),
        Arc::new(InMemoryCheckpointStore::new()),
        publisher.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.published, 4);

    let lanes: HashMap<String, String> = publisher
        .published()
        .iter()
        .map(|m| (encounter_id(m.body()), m.group_key().as_str().to_string()))
        .collect();
    assert_eq!(lanes["e0"], "001");
    assert_eq!(lanes["e1"], "002");
    assert_eq!(lanes["e2"], "001");
    assert_eq!(lanes["e3"], "002");
}

#[tokio::test]
async fn test_skip_policy_continues_past_failed_day() {
    let mut server = mockito::Server::new_async().await;
    let _first = mock_day(&mut server, "2025-01-01", bundle(vec![])).await;
    let _failing = server
        .mock("GET", "/Encounter")
        .match_query(Matcher::UrlEncoded("date".into(), "2025-01-02".into()))
        .with_status(503)
        .expect(3)
        .create_async()
        .await;
    let _third = mock_day(&mut server, "2025-01-03", bundle(vec![])).await;

    let store = Arc::new(InMemoryCheckpointStore::new());
    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-03", BatchFailurePolicy::Skip),
        store.clone(),
        Arc::new(DryRunPublisher::new()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.days_processed, 2);
    assert!(summary.halted_on.is_none());
    assert_eq!(summary.days_quarantined.len(), 1);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(
        store.get("last_processed_date").await.unwrap().as_deref(),
        Some("2025-01-03")
    );
    assert_eq!(
        store.members("unprocessed_dates").await.unwrap(),
        vec!["2025-01-02"]
    );
}

#[tokio::test]
async fn test_bounded_fan_out_processes_every_entry() {
    let mut server = mockito::Server::new_async().await;
    let _people = mock_people(&mut server).await;
    let entries = (0..6).map(|i| encounter(&format!("e{i}"))).collect();
    let _day = mock_day(&mut server, "2025-01-01", bundle(entries)).await;

    let mut settings = settings("2025-01-01", "2025-01-01", BatchFailurePolicy::Halt);
    settings.max_concurrency = 2;

    let publisher = Arc::new(DryRunPublisher::new());
    let summary = coordinator(
        &server,
        settings,
        Arc::new(InMemoryCheckpointStore::new()),
        publisher.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.entries_seen, 6);
    assert_eq!(summary.published, 6);
    assert_eq!(publisher.published().len(), 6);
    assert!(summary.is_successful());
}

#[tokio::test]
async fn test_batch_succeeding_after_retries_advances_cursor() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/Encounter")
        .match_query(Matcher::UrlEncoded("date".into(), "2025-01-01".into()))
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    let recovered = mock_day(&mut server, "2025-01-01", bundle(vec![])).await;

    let store = Arc::new(InMemoryCheckpointStore::new());
    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-01", BatchFailurePolicy::Halt),
        store.clone(),
        Arc::new(DryRunPublisher::new()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.days_processed, 1);
    assert!(summary.days_quarantined.is_empty());
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        store.get("last_processed_date").await.unwrap().as_deref(),
        Some("2025-01-01")
    );
    assert!(store.members("unprocessed_dates").await.unwrap().is_empty());

    failing.assert_async().await;
    recovered.assert_async().await;
}

#[tokio::test]
async fn test_unresolvable_patient_quarantines_encounter() {
    let mut server = mockito::Server::new_async().await;
    let _practitioner = server
        .mock("GET", "/Practitioner/p1")
        .with_status(200)
        .with_body(
            r#"{"resourceType":"Practitioner","id":"p1","name":[{"family":"Silva","given":["Ana"]}]}"#,
        )
        .create_async()
        .await;
    let _patient = server
        .mock("GET", "/Patient/x")
        .with_status(200)
        .with_body(r#"{"resourceType":"Patient","id":"x","name":[{"family":"Souza"}]}"#)
        .create_async()
        .await;
    let _day = mock_day(&mut server, "2025-01-01", bundle(vec![encounter("e1")])).await;

    let store = Arc::new(InMemoryCheckpointStore::new());
    let publisher = Arc::new(DryRunPublisher::new());
    let summary = coordinator(
        &server,
        settings("2025-01-01", "2025-01-01", BatchFailurePolicy::Halt),
        store.clone(),
        publisher.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.published, 0);
    assert_eq!(summary.quarantined, 1);
    assert!(publisher.published().is_empty());
    assert_eq!(
        store.members("invalid_encounters").await.unwrap(),
        vec!["http://fhir.test/Encounter/e1"]
    );
    assert_eq!(
        store.get("last_processed_date").await.unwrap().as_deref(),
        Some("2025-01-01")
    );
}

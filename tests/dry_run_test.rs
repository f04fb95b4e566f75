//! Integration tests for dry-run mode
//!
//! A dry run connects neither the checkpoint store nor the queue, yet still
//! walks the whole window against the source.

use harvester::config::{HarvesterConfig, LoggingConfig};
use harvester::core::harvest::HarvestCoordinator;
use mockito::Matcher;
use tokio::sync::watch;

fn dry_run_config(base_url: String) -> HarvesterConfig {
    let mut config = HarvesterConfig::default();
    config.application.dry_run = true;
    config.source.base_url = base_url;
    config.source.retry.initial_delay_ms = 1;
    config.source.retry.max_delay_ms = 2;
    config.harvest.start_date = "2025-01-01".to_string();
    config.harvest.end_date = "2025-01-02".to_string();
    // Unreachable on purpose: a dry run must not touch either
    config.checkpoint.url = "redis://127.0.0.1:1".to_string();
    config.queue.queue_url = String::new();
    config.logging = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    config
}

#[test]
fn test_dry_run_config_needs_no_queue() {
    let config = dry_run_config("http://localhost:8080/fhir".to_string());
    assert!(config.validate().is_ok());

    let mut live = config.clone();
    live.application.dry_run = false;
    assert!(live.validate().is_err());
}

#[tokio::test]
async fn test_dry_run_walks_window_without_backends() {
    let mut server = mockito::Server::new_async().await;
    let days = server
        .mock("GET", "/Encounter")
        .match_query(Matcher::Regex("date=2025-01-0[12]".to_string()))
        .with_status(200)
        .with_body(r#"{"resourceType":"Bundle","entry":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let (_tx, rx) = watch::channel(false);
    let coordinator = HarvestCoordinator::connect(&dry_run_config(server.url()), rx)
        .await
        .unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.days_processed, 2);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        summary.cursor.map(|d| d.to_string()).as_deref(),
        Some("2025-01-02")
    );
    days.assert_async().await;
}

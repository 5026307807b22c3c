//! Document acquisition against a local CORDIS-like server.

mod common;

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use common::{project_xml, spawn_document_server};
use cordisacquire::acquisition::{AcquisitionClient, AcquisitionConfig, AcquisitionError};
use cordisacquire::models::FailureKind;

async fn client_for(docs: Vec<(&str, String)>) -> (AcquisitionClient, tempfile::TempDir) {
    let docs: HashMap<String, String> = docs
        .into_iter()
        .map(|(id, body)| (id.to_string(), body))
        .collect();
    let (base_url, _) = spawn_document_server(docs).await;
    let dir = tempfile::tempdir().unwrap();
    let client =
        AcquisitionClient::new(AcquisitionConfig::new(dir.path()).with_base_url(base_url))
            .unwrap();
    (client, dir)
}

#[tokio::test]
async fn acquires_validates_and_persists() {
    let body = project_xml("101057392", "ACME-X", "Advanced Computing for Modern Exascale");
    let (client, dir) = client_for(vec![("101057392", body.clone())]).await;

    let acquired = client.acquire("101057392").await.unwrap();

    let expected_path = dir.path().join("cordis_project_101057392.xml");
    assert_eq!(acquired.document.path, expected_path);
    assert!(acquired.document.validated);
    assert!(acquired.document.warnings.is_empty(), "{:?}", acquired.document.warnings);
    assert_eq!(std::fs::read_to_string(&expected_path).unwrap(), body);

    let metadata = &acquired.metadata;
    assert_eq!(metadata.get("id"), Some("101057392"));
    assert_eq!(metadata.acronym(), Some("ACME-X"));
    assert_eq!(metadata.get("totalCost"), Some("2500000"));
    assert_eq!(metadata.file_size, body.len() as u64);
    assert_eq!(metadata.content_hash.len(), 64);
}

#[tokio::test]
async fn small_document_is_a_size_anomaly() {
    let body = r#"<project xmlns="http://cordis.europa.eu"><id>42</id><title>Tiny</title></project>"#;
    let (client, _dir) = client_for(vec![("42", body.to_string())]).await;

    let err = client.acquire("42").await.unwrap_err();

    assert!(
        matches!(err, AcquisitionError::SizeAnomaly { ref project_id, size } if project_id == "42" && size == body.len() as u64),
        "{:?}",
        err
    );
    assert_eq!(err.failure_kind(), FailureKind::SizeAnomaly);
}

#[tokio::test]
async fn mismatched_id_fails_validation() {
    let (client, _dir) = client_for(vec![("42", project_xml("43", "OTHER", "Other"))]).await;

    let err = client.acquire("42").await.unwrap_err();

    assert!(matches!(err, AcquisitionError::ValidationFailed { .. }), "{:?}", err);
    assert!(err.to_string().contains("42"));
    assert_eq!(err.failure_kind(), FailureKind::ValidationFailed);
}

#[tokio::test]
async fn wrong_root_is_rejected_before_persisting() {
    let body = format!("<html><body>{}</body></html>", "x".repeat(2000));
    let (client, dir) = client_for(vec![("42", body)]).await;

    let err = client.acquire("42").await.unwrap_err();

    assert!(matches!(err, AcquisitionError::ValidationFailed { .. }));
    assert!(!dir.path().join("cordis_project_42.xml").exists());
}

#[tokio::test]
async fn missing_project_is_a_download_failure() {
    let (client, _dir) = client_for(vec![]).await;

    let err = client.acquire("404404").await.unwrap_err();

    assert!(matches!(err, AcquisitionError::DownloadFailed { .. }), "{:?}", err);
    assert_eq!(err.failure_kind(), FailureKind::DownloadFailed);
}

#[tokio::test]
async fn reacquiring_overwrites_the_same_file() {
    let body = project_xml("7", "SEVEN", "Seventh Project");
    let (client, dir) = client_for(vec![("7", body.clone())]).await;

    let first = client.acquire("7").await.unwrap();
    let second = client.acquire("7").await.unwrap();

    assert_eq!(first.document.path, second.document.path);
    assert_eq!(first.metadata.content_hash, second.metadata.content_hash);
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn acquire_all_keeps_order_and_failures() {
    let (client, _dir) = client_for(vec![
        ("1", project_xml("1", "ONE", "First Project")),
        ("3", project_xml("3", "THREE", "Third Project")),
    ])
    .await;
    let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

    let results = client
        .acquire_all(&ids, std::time::Duration::from_millis(10))
        .await;

    let order: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["1", "2", "3"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());
}

#[tokio::test]
async fn existence_probe() {
    let docs: HashMap<String, String> =
        [("5".to_string(), project_xml("5", "FIVE", "Fifth Project"))]
            .into_iter()
            .collect();
    let (base_url, hits) = spawn_document_server(docs).await;
    let dir = tempfile::tempdir().unwrap();
    let client =
        AcquisitionClient::new(AcquisitionConfig::new(dir.path()).with_base_url(base_url))
            .unwrap();

    assert!(client.project_exists("5").await);
    assert!(!client.project_exists("6").await);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(!dir.path().join("cordis_project_5.xml").exists());
}

//! Integration tests for the download module.
//!
//! These tests exercise streaming downloads, resume via `Range`
//! requests, destination naming, and the batch worker pool against mock
//! HTTP servers.

use std::sync::Arc;

use mundi::download::{HttpClient, partial_path};
use mundi::progress::{CountingProgress, NullProgress};
use mundi::DownloadError;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_SEGMENT: &str = "S2B_MSIL1C_20191024T060919_N0208_R134_T42QUL_20191024T091214";

async fn setup_mock_file(mock_server: &MockServer, url_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_download_to_directory_derives_archive_name() {
    let mock_server = MockServer::start().await;
    let body = b"sentinel product archive bytes";
    let url_path = format!("/s2-l1c-2019-q4/{PRODUCT_SEGMENT}");
    setup_mock_file(&mock_server, &url_path, body).await;

    let outdir = TempDir::new().expect("Failed to create temp dir");
    let workdir = TempDir::new().expect("Failed to create temp dir");

    let client = HttpClient::new();
    let url = format!("{}{url_path}", mock_server.uri());
    let written = client
        .download(&url, Some(outdir.path()), Some(workdir.path()), &NullProgress)
        .await
        .expect("Download should succeed");

    assert_eq!(written, outdir.path().join(format!("{PRODUCT_SEGMENT}.zip")));
    let content = std::fs::read(&written).expect("File should exist");
    assert_eq!(content, body);
}

#[tokio::test]
async fn test_download_to_explicit_file_keeps_name() {
    let mock_server = MockServer::start().await;
    setup_mock_file(&mock_server, "/data/archive", b"payload").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let destination = dir.path().join("renamed.bin");

    let client = HttpClient::new();
    let url = format!("{}/data/archive", mock_server.uri());
    let written = client
        .download(&url, Some(&destination), Some(dir.path()), &NullProgress)
        .await
        .expect("Download should succeed");

    assert_eq!(written, destination);
    assert_eq!(std::fs::read(&destination).expect("File should exist"), b"payload");
}

#[tokio::test]
async fn test_download_reports_byte_progress() {
    let mock_server = MockServer::start().await;
    let body = vec![7u8; 4096];
    setup_mock_file(&mock_server, "/data/file.zip", &body).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let progress = CountingProgress::new();

    let client = HttpClient::new();
    let url = format!("{}/data/file.zip", mock_server.uri());
    client
        .download(&url, Some(dir.path()), Some(dir.path()), &progress)
        .await
        .expect("Download should succeed");

    assert_eq!(progress.total(), 4096);
    assert_eq!(progress.count(), 4096);
}

#[tokio::test]
async fn test_resume_sends_range_and_completes_file() {
    let mock_server = MockServer::start().await;
    let full = b"0123456789abcdef";
    let existing = &full[..6];
    let remainder = &full[6..];

    Mock::given(method("GET"))
        .and(path("/data/file.zip"))
        .and(header("Range", "bytes=6-"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(remainder.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outdir = TempDir::new().expect("Failed to create temp dir");
    let workdir = TempDir::new().expect("Failed to create temp dir");
    let destination = outdir.path().join("file.zip");

    // Leave a partial transfer behind, as an interrupted run would.
    let partial = partial_path(workdir.path(), &destination);
    std::fs::write(&partial, existing).expect("Failed to seed partial file");

    let client = HttpClient::new();
    let url = format!("{}/data/file.zip", mock_server.uri());
    let progress = CountingProgress::new();
    let written = client
        .download(&url, Some(&destination), Some(workdir.path()), &progress)
        .await
        .expect("Resume should succeed");

    assert_eq!(written, destination);
    assert_eq!(std::fs::read(&destination).expect("File should exist"), full);
    assert!(!partial.exists(), "Partial file should be moved away");
    // Progress covers the whole file, already-present bytes included.
    assert_eq!(progress.total(), full.len() as u64);
    assert_eq!(progress.count(), full.len() as u64);
}

#[tokio::test]
async fn test_full_response_after_range_restarts_from_scratch() {
    let mock_server = MockServer::start().await;
    let full = b"0123456789abcdef";

    // Server ignores the Range header and replies 200 with the full body.
    Mock::given(method("GET"))
        .and(path("/data/file.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(full.to_vec()))
        .mount(&mock_server)
        .await;

    let outdir = TempDir::new().expect("Failed to create temp dir");
    let workdir = TempDir::new().expect("Failed to create temp dir");
    let destination = outdir.path().join("file.zip");

    let partial = partial_path(workdir.path(), &destination);
    std::fs::write(&partial, b"stale-").expect("Failed to seed partial file");

    let client = HttpClient::new();
    let url = format!("{}/data/file.zip", mock_server.uri());
    let written = client
        .download(&url, Some(&destination), Some(workdir.path()), &NullProgress)
        .await
        .expect("Download should succeed");

    // The stale prefix must not survive in the output.
    assert_eq!(std::fs::read(&written).expect("File should exist"), full);
}

#[tokio::test]
async fn test_download_404_returns_http_status_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let client = HttpClient::new();
    let url = format!("{}/data/missing.zip", mock_server.uri());
    let result = client
        .download(&url, Some(dir.path()), Some(dir.path()), &NullProgress)
        .await;

    match result {
        Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("Expected HttpStatus error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_download_invalid_url_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let client = HttpClient::new();
    let result = client
        .download("not a url", Some(dir.path()), Some(dir.path()), &NullProgress)
        .await;
    assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_download_all_fetches_each_url() {
    let mock_server = MockServer::start().await;
    setup_mock_file(&mock_server, "/data/a", b"first").await;
    setup_mock_file(&mock_server, "/data/b", b"second").await;
    setup_mock_file(&mock_server, "/data/c", b"third").await;

    let outdir = TempDir::new().expect("Failed to create temp dir");
    let workdir = TempDir::new().expect("Failed to create temp dir");

    let client = HttpClient::new();
    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|name| format!("{}/data/{name}", mock_server.uri()))
        .collect();

    let written = client
        .download_all(
            &urls,
            Some(outdir.path()),
            Some(workdir.path()),
            3,
            Arc::new(NullProgress),
        )
        .await
        .expect("Batch download should succeed");

    assert_eq!(written.len(), 3);
    assert_eq!(
        std::fs::read(outdir.path().join("a.zip")).expect("File should exist"),
        b"first"
    );
    assert_eq!(
        std::fs::read(outdir.path().join("b.zip")).expect("File should exist"),
        b"second"
    );
    assert_eq!(
        std::fs::read(outdir.path().join("c.zip")).expect("File should exist"),
        b"third"
    );
}

#[tokio::test]
async fn test_download_all_duplicate_urls_yield_one_file() {
    let mock_server = MockServer::start().await;
    let body = b"shared archive";
    setup_mock_file(&mock_server, "/data/dup", body).await;

    let outdir = TempDir::new().expect("Failed to create temp dir");
    let workdir = TempDir::new().expect("Failed to create temp dir");

    let client = HttpClient::new();
    let url = format!("{}/data/dup", mock_server.uri());
    let urls = vec![url; 5];

    let written = client
        .download_all(
            &urls,
            Some(outdir.path()),
            Some(workdir.path()),
            5,
            Arc::new(NullProgress),
        )
        .await
        .expect("Batch download should succeed");

    // All five workers target the same destination.
    assert_eq!(written.len(), 5);
    let unique: std::collections::HashSet<_> = written.iter().collect();
    assert_eq!(unique.len(), 1);
    assert_eq!(
        std::fs::read(outdir.path().join("dup.zip")).expect("File should exist"),
        body
    );
    let leftovers: Vec<_> = std::fs::read_dir(workdir.path())
        .expect("Workdir should exist")
        .collect();
    assert!(leftovers.is_empty(), "No partial files should remain");
}

#[tokio::test]
async fn test_download_all_propagates_first_failure() {
    let mock_server = MockServer::start().await;
    setup_mock_file(&mock_server, "/data/good", b"ok").await;
    Mock::given(method("GET"))
        .and(path("/data/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let client = HttpClient::new();
    let urls = vec![
        format!("{}/data/good", mock_server.uri()),
        format!("{}/data/bad", mock_server.uri()),
    ];

    let result = client
        .download_all(&urls, Some(dir.path()), Some(dir.path()), 2, Arc::new(NullProgress))
        .await;
    assert!(matches!(result, Err(DownloadError::HttpStatus { status: 500, .. })));
}

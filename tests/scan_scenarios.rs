//! End-to-end scan scenarios against a mocked issue tracker
//!
//! Each test stands up a `wiremock` server playing the remote tracker's
//! `/rest/api/2/search` endpoint and per-attachment content endpoints, then
//! drives a real [`Scanner`] against it and asserts on the resulting
//! [`ResultDocument`].

mod common;

use attachment_audit::orchestrator::Scanner;
use attachment_audit::types::Event;
use common::{attachment_json, issue_json, search_responder, test_config};
use std::collections::HashMap;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

#[tokio::test]
async fn two_identical_attachments_and_one_unique_produce_one_duplicate_group() {
    let server = MockServer::start().await;

    let page = vec![issue_json(
        "PROJ-1",
        "PROJ",
        vec![
            attachment_json("1", "dup.bin", 10, &format!("{}/secure/attachment/1/dup.bin", server.uri())),
            attachment_json("2", "dup.bin", 10, &format!("{}/secure/attachment/2/dup.bin", server.uri())),
            attachment_json("3", "unique.bin", 20, &format!("{}/secure/attachment/3/unique.bin", server.uri())),
        ],
    )];
    let mut pages = HashMap::new();
    pages.insert(0, page);

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(pages, 1))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secure/attachment/1/dup.bin"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secure/attachment/2/dup.bin"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secure/attachment/3/unique.bin"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"0123456789012345678".to_vec()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path().join("scan.db"));
    let scanner = Scanner::new(config).await.unwrap();

    let result = scanner.start().await.unwrap();

    assert_eq!(result.stats.total_files, 3);
    assert_eq!(result.stats.canonical_files, 2);
    assert_eq!(result.stats.duplicate_files, 1);
    assert_eq!(result.stats.duplicate_size, 10);
    assert_eq!(result.duplicate_groups.values().filter(|g| g.duplicate_count > 0).count(), 1);
}

#[tokio::test]
async fn twenty_five_identical_attachments_cap_locations_but_keep_counting() {
    let server = MockServer::start().await;

    let attachments = (0..25)
        .map(|i| attachment_json(&i.to_string(), "same.bin", 10, &format!("{}/secure/attachment/{i}/same.bin", server.uri())))
        .collect();
    let page = vec![issue_json("PROJ-1", "PROJ", attachments)];
    let mut pages = HashMap::new();
    pages.insert(0, page);

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(pages, 1))
        .mount(&server)
        .await;

    for i in 0..25 {
        Mock::given(method("GET"))
            .and(path(format!("/secure/attachment/{i}/same.bin")))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
            .mount(&server)
            .await;
    }

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path().join("scan.db"));
    let scanner = Scanner::new(config).await.unwrap();

    let result = scanner.start().await.unwrap();

    assert_eq!(result.stats.total_files, 25);
    assert_eq!(result.stats.canonical_files, 1);
    assert_eq!(result.stats.duplicate_files, 24);

    let group = result.duplicate_groups.values().next().unwrap();
    assert_eq!(group.duplicate_count, 24);
    assert_eq!(group.locations.len(), attachment_audit::types::MAX_LOCATIONS_PER_GROUP);
}

#[tokio::test]
async fn oversize_attachment_is_never_fetched_and_falls_back_to_url_hash() {
    let server = MockServer::start().await;

    let content_url = format!("{}/secure/attachment/1/huge.bin", server.uri());
    let page = vec![issue_json("PROJ-1", "PROJ", vec![attachment_json("1", "huge.bin", 1_000_000, &content_url)])];
    let mut pages = HashMap::new();
    pages.insert(0, page);

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(pages, 1))
        .mount(&server)
        .await;
    // Deliberately no mock for the content endpoint: an oversize attachment
    // must never be fetched, so a request there would otherwise 404.

    let dir = tempdir().unwrap();
    let mut config = test_config(&server.uri(), dir.path().join("scan.db"));
    config.scan.max_file_bytes = 1024;
    let scanner = Scanner::new(config).await.unwrap();
    let mut events = scanner.subscribe();

    let result = scanner.start().await.unwrap();

    assert_eq!(result.stats.total_files, 1);
    assert_eq!(result.stats.canonical_files, 1);
    let group = result.duplicate_groups.values().next().unwrap();
    assert_eq!(group.fingerprint, attachment_audit::hasher::hash_url(&content_url));

    let warning = drain_attachment_warnings(&mut events);
    assert!(warning.iter().any(|m| m.contains("exceeds max_file_bytes")));
}

#[tokio::test]
async fn truncated_download_falls_back_to_url_hash() {
    let server = MockServer::start().await;

    let content_url = format!("{}/secure/attachment/1/partial.bin", server.uri());
    let page = vec![issue_json("PROJ-1", "PROJ", vec![attachment_json("1", "partial.bin", 1000, &content_url)])];
    let mut pages = HashMap::new();
    pages.insert(0, page);

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(pages, 1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secure/attachment/1/partial.bin"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"only ten bytes, far short of 1000".to_vec()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path().join("scan.db"));
    let scanner = Scanner::new(config).await.unwrap();
    let mut events = scanner.subscribe();

    let result = scanner.start().await.unwrap();

    let group = result.duplicate_groups.values().next().unwrap();
    assert_eq!(group.fingerprint, attachment_audit::hasher::hash_url(&content_url));

    let warnings = drain_attachment_warnings(&mut events);
    assert!(warnings.iter().any(|m| m.contains("truncated")));
}

#[tokio::test]
async fn empty_result_set_completes_with_zeroed_statistics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(HashMap::new(), 0))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path().join("scan.db"));
    let scanner = Scanner::new(config).await.unwrap();

    let result = scanner.start().await.unwrap();

    assert_eq!(result.scan.total_issues, 0);
    assert_eq!(result.scan.status, attachment_audit::types::ScanStatus::Completed);
    assert_eq!(result.stats.total_files, 0);
    assert!(result.duplicate_groups.is_empty());
    assert!(result.quick_wins.is_empty());
}

fn drain_attachment_warnings(events: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::AttachmentWarning { message, .. } = event {
            messages.push(message);
        }
    }
    messages
}

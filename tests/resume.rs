//! Checkpoint / resume integration tests
//!
//! Rather than racing real cancellation against a live scan (inherently
//! timing-sensitive), these tests exercise the resume contract directly:
//! seed the store with the state a crash would have left behind (a
//! `Running` scan, a checkpoint, partial statistics and a duplicate group),
//! then call `Scanner::resume` and verify it picks up from there without
//! refetching or recounting anything before the checkpoint.

mod common;

use attachment_audit::orchestrator::Scanner;
use attachment_audit::store::Store;
use attachment_audit::types::{DuplicateGroup, Location, Scan, ScanStatistics};
use chrono::Utc;
use common::{attachment_json, issue_json, search_responder, test_config};
use std::collections::HashMap;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

#[tokio::test]
async fn requesting_shutdown_before_start_interrupts_on_the_first_loop_check() {
    let server = MockServer::start().await;

    // Never actually requested: cancellation is checked before the first
    // page fetch, so this mock existing or not is irrelevant to the outcome.
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(HashMap::new(), 0))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path().join("scan.db"));
    let scanner = Scanner::new(config).await.unwrap();

    scanner.request_shutdown();
    let result = scanner.start().await;

    assert!(matches!(result, Err(attachment_audit::Error::Interrupted)));
}

#[tokio::test]
async fn resume_continues_from_the_checkpoint_without_recounting_prior_issues() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("scan.db");

    // Seed the store as if one issue (PROJ-1, one attachment) had already
    // been processed and checkpointed before a crash.
    let store = Store::open(&db_path).await.unwrap();
    let mut scan = Scan::new("resumeid".to_string(), 2, "created >= -7300d ORDER BY created DESC".to_string(), serde_json::json!({}));
    scan.processed_issues = 1;
    store.create_scan(&scan).await.unwrap();

    let mut stats = ScanStatistics::default();
    stats.total_files = 1;
    stats.total_size = 10;
    stats.canonical_files = 1;

    let mut groups = HashMap::new();
    let seeded_fingerprint = attachment_audit::hasher::hash_url("seed-only, never refetched");
    groups.insert(
        seeded_fingerprint.clone(),
        DuplicateGroup {
            fingerprint: seeded_fingerprint.clone(),
            file_name: "first.bin".into(),
            file_size: 10,
            mime_type: "application/octet-stream".into(),
            canonical_issue_key: "PROJ-1".into(),
            canonical_attachment_id: "1".into(),
            duplicate_count: 0,
            total_wasted_space: 0,
            author_name: "alice".into(),
            author_id: "alice".into(),
            created_at: Utc::now(),
            issue_status: "Open".into(),
            issue_status_category: "new".into(),
            issue_last_updated: Utc::now(),
            locations: vec![Location {
                issue_key: "PROJ-1".into(),
                project_key: "PROJ".into(),
                attachment_id: "1".into(),
                is_canonical: true,
                date_added: Utc::now(),
                author: "alice".into(),
            }],
        },
    );

    store.save_progress(&scan, &stats, &groups, 1, Some("PROJ-1")).await.unwrap();
    drop(store);

    // The remote tracker only ever serves the second page (startAt=1); a
    // request for startAt=0 would mean the resumed scan re-fetched work it
    // already has, and the mock would answer it with a fabricated page that
    // would double-count PROJ-1 if the resume logic were broken.
    let server = MockServer::start().await;
    let second_page = vec![issue_json(
        "PROJ-2",
        "PROJ",
        vec![attachment_json("2", "second.bin", 8, &format!("{}/secure/attachment/2/second.bin", server.uri()))],
    )];
    let mut pages = HashMap::new();
    pages.insert(1, second_page);

    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(search_responder(pages, 2))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secure/attachment/2/second.bin"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"eightbyt".to_vec()))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), db_path);
    let scanner = Scanner::new(config).await.unwrap();

    let result = scanner.resume("resumeid").await.unwrap();

    // Exactly one new file counted on top of the seeded one: resume neither
    // dropped the pre-checkpoint state nor re-processed PROJ-1.
    assert_eq!(result.stats.total_files, 2);
    assert_eq!(result.stats.canonical_files, 2);
    assert_eq!(result.stats.total_size, 18);
    assert!(result.duplicate_groups.contains_key(&seeded_fingerprint));
    assert_eq!(result.scan.processed_issues, 2);

    let requests = server.received_requests().await.unwrap();
    let saw_start_at_zero = requests.iter().any(|req| {
        req.url.query_pairs().any(|(key, value)| key == "startAt" && value == "0")
    });
    assert!(!saw_start_at_zero, "resume must not refetch the page before its checkpoint");
}

#[tokio::test]
async fn resuming_a_completed_scan_is_rejected() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("scan.db");

    let store = Store::open(&db_path).await.unwrap();
    let scan = Scan::new("done1234".to_string(), 1, "created >= -7300d ORDER BY created DESC".to_string(), serde_json::json!({}));
    store.create_scan(&scan).await.unwrap();
    store.complete_scan(&scan.id, Utc::now(), 5).await.unwrap();
    drop(store);

    let server = MockServer::start().await;
    let config = test_config(&server.uri(), db_path);
    let scanner = Scanner::new(config).await.unwrap();

    let result = scanner.resume("done1234").await;
    assert!(result.is_err());
}

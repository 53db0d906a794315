//! Shared fixtures for attachment-audit integration tests

use attachment_audit::config::{Config, FilterConfig, OutputConfig, RemoteConfig, ScanConfig, StorageConfig};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use wiremock::{Request, ResponseTemplate};

/// A minimal config pointed at a wiremock server and a scratch database
pub fn test_config(base_url: &str, database_path: PathBuf) -> Config {
    Config {
        remote: RemoteConfig {
            base_url: base_url.to_string(),
            token: Some("test-token".to_string()),
            username: None,
            password: None,
            verify_ssl: true,
        },
        scan: ScanConfig {
            page_size: 100,
            worker_count: 4,
            max_file_bytes: 5 * 1024 * 1024 * 1024,
            download_timeout_seconds: 5,
            rate_limit_per_second: 0.0,
            use_content_hash: true,
        },
        storage: StorageConfig {
            database_path,
            checkpoint_interval: 1,
        },
        filters: FilterConfig::default(),
        output: OutputConfig::default(),
    }
}

/// Build one issue JSON record with the given attachments
pub fn issue_json(key: &str, project_key: &str, attachments: Vec<Value>) -> Value {
    json!({
        "key": key,
        "fields": {
            "project": {"key": project_key, "name": format!("Project {project_key}")},
            "status": {"name": "Open", "statusCategory": {"name": "To Do", "key": "new"}},
            "updated": "2024-01-01T00:00:00Z",
            "attachment": attachments,
        }
    })
}

/// Build one attachment JSON record
pub fn attachment_json(id: &str, filename: &str, size: u64, content_url: &str) -> Value {
    json!({
        "id": id,
        "filename": filename,
        "size": size,
        "mimeType": "application/octet-stream",
        "content": content_url,
        "created": "2024-01-01T00:00:00Z",
        "author": {"displayName": "alice", "key": "alice"},
    })
}

/// A search responder keyed by `startAt`, falling back to an empty page for
/// any offset it wasn't given an explicit page for
///
/// This is what keeps the scan loop's pagination advancing and eventually
/// terminating: once it requests a page one past the last one registered
/// here, it gets an empty `issues` array and stops.
pub fn search_responder(
    pages_by_offset: HashMap<i64, Vec<Value>>,
    total: i64,
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let start_at: i64 = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "startAt")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(0);

        let issues = pages_by_offset.get(&start_at).cloned().unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "total": total, "issues": issues }))
    }
}

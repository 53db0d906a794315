//! Configuration types for attachment-audit
//!
//! Groups settings into logical sub-configs — [`RemoteConfig`],
//! [`ScanConfig`], [`StorageConfig`], [`FilterConfig`], [`OutputConfig`] —
//! each carrying its own defaults so a near-empty TOML file is a valid
//! configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Remote issue-tracker connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote issue-tracker (required)
    pub base_url: String,

    /// Bearer token credential (preferred over username/password)
    #[serde(default)]
    pub token: Option<String>,

    /// Basic auth username (used with `password`)
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password (used with `username`)
    #[serde(default)]
    pub password: Option<String>,

    /// Verify TLS certificates (default: true)
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

impl RemoteConfig {
    /// Resolve the exactly-one configured credential form
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.token, &self.username, &self.password) {
            (Some(token), None, None) => Ok(Credentials::Bearer(token.clone())),
            (None, Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None, None) => Err(Error::Config {
                message: "exactly one of remote.token or remote.username+remote.password is required".into(),
                key: Some("remote.token".into()),
            }),
            _ => Err(Error::Config {
                message: "configure either remote.token or remote.username+remote.password, not both".into(),
                key: Some("remote.token".into()),
            }),
        }
    }
}

/// Resolved authentication form for the remote HTTP client
#[derive(Clone, Debug)]
pub enum Credentials {
    /// Bearer token authentication
    Bearer(String),
    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

/// Scan behavior configuration (pagination, concurrency, hashing)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Issues requested per search page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Bounded download worker pool size (default: 12)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Attachments larger than this are never fetched; a URL-hash is
    /// substituted instead (default: 5 GiB)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Per-request download timeout in seconds (default: 300)
    #[serde(default = "default_download_timeout_seconds")]
    pub download_timeout_seconds: u64,

    /// Maximum outbound requests per second (default: 50)
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: f64,

    /// When true (default), fingerprint attachment bytes; when false, hash
    /// the content URL instead as an explicit fast-path
    #[serde(default = "default_true")]
    pub use_content_hash: bool,
}

impl ScanConfig {
    /// Per-request download timeout as a [`Duration`]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            worker_count: default_worker_count(),
            max_file_bytes: default_max_file_bytes(),
            download_timeout_seconds: default_download_timeout_seconds(),
            rate_limit_per_second: default_rate_limit_per_second(),
            use_content_hash: true,
        }
    }
}

/// Persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Write a checkpoint every N processed issues (default: 100)
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// Search predicate / scope filters
///
/// Exactly one of `custom_predicate` or `projects` (with optional date
/// bounds) should be set; when both are empty the default 20-year lookback
/// is used.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// A raw predicate string, used verbatim (an ordering clause is
    /// appended if the predicate doesn't already specify one)
    #[serde(default)]
    pub custom_predicate: Option<String>,

    /// Project keys to restrict the scan to
    #[serde(default)]
    pub projects: Vec<String>,

    /// Inclusive lower date bound, e.g. "2020-01-01"
    #[serde(default)]
    pub date_from: Option<String>,

    /// Inclusive upper date bound, e.g. "2024-01-01"
    #[serde(default)]
    pub date_to: Option<String>,
}

/// Output settings for downstream reporting collaborators
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory report generators should write artifacts into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Retry/backoff tuning shared by the HTTP client's transport retry loop
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum retry attempts after the first try
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub backoff_multiplier: f64,
    /// Whether to randomize delays to avoid thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Top-level configuration for the scanner
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote issue-tracker connection settings
    pub remote: RemoteConfig,
    /// Scan behavior configuration
    #[serde(default)]
    pub scan: ScanConfig,
    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Search predicate / scope filters
    #[serde(default)]
    pub filters: FilterConfig,
    /// Output settings for reporting collaborators
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config {
            message: format!("failed to parse configuration: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// A JSON snapshot of this configuration with credentials redacted
    ///
    /// Used as `Scan.config_snapshot` — the audit trail records which
    /// remote, filters, and tuning were used, never the secret itself.
    pub fn redacted_snapshot(&self) -> serde_json::Value {
        let mut snapshot = self.clone();
        snapshot.remote.token = snapshot.remote.token.as_ref().map(|_| "<redacted>".to_string());
        snapshot.remote.password = snapshot.remote.password.as_ref().map(|_| "<redacted>".to_string());
        serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null)
    }

    /// Validate cross-field invariants not expressible via serde defaults
    pub fn validate(&self) -> Result<()> {
        self.remote.credentials()?;

        url::Url::parse(&self.remote.base_url).map_err(|e| Error::Config {
            message: format!("remote.base_url is not a valid URL: {e}"),
            key: Some("remote.base_url".into()),
        })?;

        if self.filters.custom_predicate.is_some() && !self.filters.projects.is_empty() {
            return Err(Error::Config {
                message: "configure either filters.custom_predicate or filters.projects, not both".into(),
                key: Some("filters.custom_predicate".into()),
            });
        }

        if self.scan.worker_count == 0 {
            return Err(Error::Config {
                message: "scan.worker_count must be at least 1".into(),
                key: Some("scan.worker_count".into()),
            });
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> i64 {
    100
}

fn default_worker_count() -> usize {
    12
}

fn default_max_file_bytes() -> u64 {
    5 * 1024 * 1024 * 1024
}

fn default_download_timeout_seconds() -> u64 {
    300
}

fn default_rate_limit_per_second() -> f64 {
    50.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./attachment-audit.db")
}

fn default_checkpoint_interval() -> u64 {
    100
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./reports")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        [remote]
        base_url = "https://jira.example.com"
        token = "secret"
        "#
    }

    #[test]
    fn applies_defaults_for_omitted_sections() {
        let config = Config::from_toml(minimal_toml()).unwrap();
        assert_eq!(config.scan.page_size, 100);
        assert_eq!(config.scan.worker_count, 12);
        assert_eq!(config.scan.max_file_bytes, 5 * 1024 * 1024 * 1024);
        assert_eq!(config.scan.download_timeout_seconds, 300);
        assert_eq!(config.storage.checkpoint_interval, 100);
        assert!(config.scan.use_content_hash);
    }

    #[test]
    fn redacted_snapshot_never_exposes_token() {
        let config = Config::from_toml(minimal_toml()).unwrap();
        let snapshot = config.redacted_snapshot();
        assert_eq!(snapshot["remote"]["token"], "<redacted>");
        assert!(!snapshot.to_string().contains("secret"));
    }

    #[test]
    fn resolves_bearer_credentials() {
        let config = Config::from_toml(minimal_toml()).unwrap();
        match config.remote.credentials().unwrap() {
            Credentials::Bearer(token) => assert_eq!(token, "secret"),
            Credentials::Basic { .. } => panic!("expected bearer"),
        }
    }

    #[test]
    fn rejects_missing_credentials() {
        let toml = r#"
        [remote]
        base_url = "https://jira.example.com"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn rejects_both_credential_forms() {
        let toml = r#"
        [remote]
        base_url = "https://jira.example.com"
        token = "secret"
        username = "bob"
        password = "hunter2"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn resolves_basic_credentials() {
        let toml = r#"
        [remote]
        base_url = "https://jira.example.com"
        username = "bob"
        password = "hunter2"
        "#;
        let config = Config::from_toml(toml).unwrap();
        match config.remote.credentials().unwrap() {
            Credentials::Basic { username, password } => {
                assert_eq!(username, "bob");
                assert_eq!(password, "hunter2");
            }
            Credentials::Bearer(_) => panic!("expected basic"),
        }
    }

    #[test]
    fn rejects_custom_predicate_and_projects_together() {
        let toml = r#"
        [remote]
        base_url = "https://jira.example.com"
        token = "secret"

        [filters]
        custom_predicate = "project = FOO"
        projects = ["FOO"]
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn rejects_malformed_base_url() {
        let toml = r#"
        [remote]
        base_url = "not-a-url"
        token = "secret"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_zero_worker_count() {
        let toml = r#"
        [remote]
        base_url = "https://jira.example.com"
        token = "secret"

        [scan]
        worker_count = 0
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("worker_count"));
    }
}

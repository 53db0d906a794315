//! Error types for attachment-audit
//!
//! This module provides the crate-wide error taxonomy, including:
//! - Domain-specific error types (remote transport, storage, scan control flow)
//! - Retryability classification, consumed by [`crate::retry`]
//! - Context information (status codes, scan ids, keys) on each variant

use thiserror::Error;

/// Result type alias for attachment-audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for attachment-audit
///
/// Each variant carries enough context to produce an operator-facing message
/// that distinguishes credential problems, connectivity problems, and server
/// rejections, per the propagation policy in the scan design.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g. "remote.token")
        key: Option<String>,
    },

    /// Remote issue-tracker transport or protocol error
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Storage layer error
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// SQLx database error
    #[error("storage error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Scan control-flow error
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Underlying HTTP client error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cooperative shutdown requested; the caller should stop and checkpoint
    #[error("scan interrupted")]
    Interrupted,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Remote issue-tracker errors
///
/// Maps directly onto the disposition table in the scan design: each
/// variant is either fatal (auth/authorization), surfaced-but-not-retried
/// (rate limited), or transient (retried by [`crate::retry`] before
/// reaching the caller as this error).
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 401 from the remote tracker — credential problem
    #[error("authentication failed (401): check remote.token or remote.username/password")]
    Authentication,

    /// 403 from the remote tracker — permission problem
    #[error("permission denied (403): the configured credentials lack access")]
    Authorization,

    /// 429 from the remote tracker — operator should lower the configured rate
    #[error("rate limited (429) by remote tracker: lower scan.rate_limit_per_second")]
    RateLimited,

    /// Network error, timeout, or 5xx exhausted after retries
    #[error("transport error after retries: {0}")]
    Transport(String),

    /// Unexpected response shape from the remote tracker
    #[error("unexpected response from remote tracker: {0}")]
    UnexpectedResponse(String),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to or create the database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Scan record not found
    #[error("scan not found: {0}")]
    NotFound(String),
}

/// Scan control-flow errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// `search` raised after retries were exhausted; the scan loop aborts but
    /// remains resumable because a checkpoint is attempted first
    #[error("page fetch failed at offset {offset}: {reason}")]
    PageFetchFailed {
        /// Pagination offset of the page that failed
        offset: i64,
        /// Underlying error
        reason: String,
    },

    /// Attempted to resume or reset a scan id that does not exist
    #[error("scan {0} not found")]
    NotFound(String),

    /// Attempted an operation on a scan in a state that forbids it
    #[error("scan {id} is {status}, cannot {operation}")]
    InvalidState {
        /// The scan id
        id: String,
        /// The current status
        status: String,
        /// The attempted operation
        operation: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_messages_distinguish_credential_vs_connectivity_vs_rejection() {
        let auth = RemoteError::Authentication;
        let perm = RemoteError::Authorization;
        let rate = RemoteError::RateLimited;
        let transport = RemoteError::Transport("connection reset".into());

        assert!(auth.to_string().contains("authentication"));
        assert!(perm.to_string().contains("permission"));
        assert!(rate.to_string().contains("rate limited"));
        assert!(transport.to_string().contains("transport error"));
    }

    #[test]
    fn error_from_remote_error_preserves_display() {
        let remote = RemoteError::RateLimited;
        let display = remote.to_string();
        let err: Error = remote.into();
        assert_eq!(err.to_string(), format!("remote error: {display}"));
    }

    #[test]
    fn scan_error_page_fetch_failed_includes_offset() {
        let err = ScanError::PageFetchFailed {
            offset: 400,
            reason: "timeout".into(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn store_error_not_found_includes_id() {
        let err = StoreError::NotFound("ab12cd34".into());
        assert!(err.to_string().contains("ab12cd34"));
    }
}

//! Core domain types for attachment-audit
//!
//! These are the statically-typed, in-memory forms of the scan's data
//! model. The storage layer serializes parts of this (locations, the
//! per-project/per-extension sub-aggregates) to JSON on disk, but nothing
//! outside [`crate::store`] should ever hold the JSON form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of [`Location`] records retained per [`DuplicateGroup`]
///
/// An intentional bounded-memory decision: counts (`duplicate_count`,
/// `total_wasted_space`) keep accumulating past this cap, only the location
/// list itself stops growing.
pub const MAX_LOCATIONS_PER_GROUP: usize = 20;

/// Sentinel extension used when a file name has no dot-suffix
pub const NO_EXTENSION: &str = "no-extension";

/// Lifecycle status of a [`Scan`]
///
/// There is deliberately no `Failed` terminal state: a catastrophic failure
/// leaves the scan `Running`, to be resumed or reset by the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The scan is in progress or was interrupted mid-run
    Running,
    /// The scan reached the end of its predicate's result set
    Completed,
}

impl ScanStatus {
    /// Parse from the storage layer's text representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Render as the storage layer's text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

/// A top-level scan run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scan {
    /// Opaque 8-character scan identifier
    pub id: String,
    /// Current lifecycle status
    pub status: ScanStatus,
    /// Total matching issue count, snapshotted at scan start
    pub total_issues: i64,
    /// Monotonically increasing count of issues processed so far
    pub processed_issues: i64,
    /// When the scan was started
    pub started_at: DateTime<Utc>,
    /// When the scan reached `Completed`, if it has
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration of the scan, once completed
    pub duration_seconds: Option<i64>,
    /// The search predicate used for this scan
    pub predicate: String,
    /// A snapshot of the run configuration, for audit purposes
    pub config_snapshot: serde_json::Value,
}

impl Scan {
    /// Start a fresh scan record
    pub fn new(id: String, total_issues: i64, predicate: String, config_snapshot: serde_json::Value) -> Self {
        Self {
            id,
            status: ScanStatus::Running,
            total_issues,
            processed_issues: 0,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            predicate,
            config_snapshot,
        }
    }
}

/// Rolling per-dimension aggregate (per-project or per-extension)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DimensionStats {
    /// Human-readable display name for this dimension value
    pub display_name: String,
    /// Total files seen for this dimension value
    pub files: u64,
    /// Total bytes seen for this dimension value
    pub bytes: u64,
    /// Non-canonical ("excess") files for this dimension value
    pub duplicate_files: u64,
    /// Wasted bytes for this dimension value
    pub duplicate_bytes: u64,
}

/// Per-scan rolling aggregate statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanStatistics {
    /// Total files seen across the whole scan
    pub total_files: u64,
    /// Total bytes seen across the whole scan (declared sizes)
    pub total_size: u64,
    /// Count of canonical (first-seen) files, i.e. distinct fingerprints
    pub canonical_files: u64,
    /// Count of non-canonical ("excess") files
    pub duplicate_files: u64,
    /// Wasted bytes: sum of non-canonical copies' sizes
    pub duplicate_size: u64,
    /// Sub-aggregate keyed by project key
    pub by_project: HashMap<String, DimensionStats>,
    /// Sub-aggregate keyed by lowercased file extension
    pub by_extension: HashMap<String, DimensionStats>,
}

/// Why a fingerprint came from a URL hash rather than file content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The chunked transfer ended before the declared size was reached
    Truncated,
    /// The per-request download timeout elapsed
    Timeout,
    /// Any other I/O error during transfer
    OtherIo,
}

/// Provenance of a [`DuplicateGroup`]'s or worker result's fingerprint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HashSource {
    /// The fingerprint is a SHA-256 of the actual attachment bytes
    Content,
    /// The attachment bytes could not be fetched; fingerprint is a hash of
    /// the content URL instead
    UrlFallback {
        /// Why content hashing was not used
        reason: FallbackReason,
    },
    /// The attachment was never fetched because its declared size exceeded
    /// `scan.max_file_bytes`
    OversizeSkip,
    /// Content hashing is disabled by configuration (`scan.use_content_hash
    /// = false`); fingerprint is a hash of the content URL by design, not
    /// because anything failed
    UrlOnly,
}

/// One recorded sighting of a fingerprint on an issue
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Location {
    /// The issue key this attachment was found on (e.g. "PROJ-123")
    pub issue_key: String,
    /// The project key of that issue
    pub project_key: String,
    /// The attachment's id on the remote tracker
    pub attachment_id: String,
    /// True for exactly one location per group: the first-seen occurrence
    pub is_canonical: bool,
    /// When the attachment was added, per the remote tracker
    pub date_added: DateTime<Utc>,
    /// Display name of the attachment's author
    pub author: String,
}

/// The set of all locations sharing a single content fingerprint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// 256-bit content fingerprint, lowercase hex
    pub fingerprint: String,
    /// Representative (canonical) file name
    pub file_name: String,
    /// Byte size, as declared by the remote tracker
    pub file_size: u64,
    /// Declared media type
    pub mime_type: String,
    /// Issue key of the canonical location
    pub canonical_issue_key: String,
    /// Attachment id of the canonical location
    pub canonical_attachment_id: String,
    /// Copies beyond the canonical one
    pub duplicate_count: u64,
    /// `file_size * duplicate_count`
    pub total_wasted_space: u64,
    /// Display name of the canonical location's author
    pub author_name: String,
    /// Stable id of the canonical location's author
    pub author_id: String,
    /// When the canonical attachment was created
    pub created_at: DateTime<Utc>,
    /// Status name of the canonical location's issue
    pub issue_status: String,
    /// Status category of the canonical location's issue
    pub issue_status_category: String,
    /// Last-updated timestamp of the canonical location's issue
    pub issue_last_updated: DateTime<Utc>,
    /// Up to [`MAX_LOCATIONS_PER_GROUP`] locations; actual sighting count
    /// may exceed `locations.len()` (see `duplicate_count`)
    pub locations: Vec<Location>,
}

impl DuplicateGroup {
    /// True if exactly one location is marked canonical
    pub fn has_single_canonical(&self) -> bool {
        self.locations.iter().filter(|l| l.is_canonical).count() == 1
    }
}

/// Quick-win ranking key: a duplicate group with high wasted bytes
pub type QuickWin = DuplicateGroup;

/// Checkpointed resume state for a scan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The scan this checkpoint belongs to
    pub scan_id: String,
    /// Pagination offset of the next unprocessed page
    pub next_offset: i64,
    /// Issue key of the last issue processed before this checkpoint
    pub last_issue_key: Option<String>,
    /// When this checkpoint was written
    pub checkpointed_at: DateTime<Utc>,
}

/// The finalized, structured output handed to reporting collaborators
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultDocument {
    /// The scan record
    pub scan: Scan,
    /// Rolling aggregate statistics
    pub stats: ScanStatistics,
    /// All duplicate groups, keyed by fingerprint
    pub duplicate_groups: HashMap<String, DuplicateGroup>,
    /// Top-3 groups by wasted bytes among those with `duplicate_count > 0`
    pub quick_wins: Vec<QuickWin>,
}

/// Progress / lifecycle events emitted by the orchestrator
///
/// Consumers subscribe via a broadcast channel; there is no polling API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A scan has started (fresh or resumed)
    ScanStarted {
        /// The scan id
        scan_id: String,
        /// Total issues the predicate matched at scan start
        total_issues: i64,
    },
    /// Progress since the last page was processed
    Progress {
        /// The scan id
        scan_id: String,
        /// Issues processed so far
        processed_issues: i64,
        /// Total issues to process
        total_issues: i64,
        /// Total files seen so far
        total_files: u64,
        /// Total bytes seen so far
        total_size: u64,
        /// Wasted bytes so far
        duplicate_size: u64,
    },
    /// A per-attachment warning (oversize skip, fallback, drop)
    AttachmentWarning {
        /// The scan id
        scan_id: String,
        /// The attachment id this warning concerns
        attachment_id: String,
        /// Human-readable warning message
        message: String,
    },
    /// A checkpoint was written
    Checkpointed {
        /// The scan id
        scan_id: String,
        /// Pagination offset recorded in the checkpoint
        next_offset: i64,
    },
    /// The scan reached completion
    ScanCompleted {
        /// The scan id
        scan_id: String,
        /// Wall-clock duration in seconds
        duration_seconds: i64,
    },
    /// The scan was interrupted by a cooperative cancel signal
    ScanInterrupted {
        /// The scan id
        scan_id: String,
    },
}

/// Derive the lowercased extension used for the per-extension aggregate
///
/// Absence of a dot yields [`NO_EXTENSION`].
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => NO_EXTENSION.to_string(),
    }
}

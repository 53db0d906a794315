//! Wire DTOs for the remote issue-tracker's REST API
//!
//! Shapes mirror Jira Data Center's actual attachment/issue JSON: camelCase
//! fields, nested `fields.*` for issue metadata. Deserialize-only — this
//! crate never constructs these to send, only receives them.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a `search` call
#[derive(Clone, Debug, Deserialize)]
pub struct SearchPage {
    /// Issues on this page
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Total matching issue count, independent of page size
    pub total: i64,
}

/// An issue record, as returned with `fields=key,project,status,updated,attachment`
#[derive(Clone, Debug, Deserialize)]
pub struct Issue {
    /// Issue key, e.g. "PROJ-123"
    pub key: String,
    /// Nested issue fields
    pub fields: IssueFields,
}

/// The subset of issue fields this scanner requests
#[derive(Clone, Debug, Deserialize)]
pub struct IssueFields {
    /// Owning project
    pub project: Project,
    /// Workflow status
    pub status: Status,
    /// Last-updated timestamp
    pub updated: DateTime<Utc>,
    /// Attachments on this issue
    #[serde(default, rename = "attachment")]
    pub attachments: Vec<Attachment>,
}

/// Project reference embedded in an issue
#[derive(Clone, Debug, Deserialize)]
pub struct Project {
    /// Project key, e.g. "PROJ"
    pub key: String,
    /// Project display name
    pub name: String,
}

/// Workflow status embedded in an issue
#[derive(Clone, Debug, Deserialize)]
pub struct Status {
    /// Status name, e.g. "In Progress"
    pub name: String,
    /// Status category, e.g. {name: "In Progress", key: "indeterminate"}
    #[serde(rename = "statusCategory")]
    pub status_category: StatusCategory,
}

/// Status category embedded in a status
#[derive(Clone, Debug, Deserialize)]
pub struct StatusCategory {
    /// Category display name, e.g. "To Do", "In Progress", "Done"
    pub name: String,
    /// Category key, e.g. "new", "indeterminate", "done"
    pub key: String,
}

/// An attachment metadata record
#[derive(Clone, Debug, Deserialize)]
pub struct Attachment {
    /// Attachment id on the remote tracker
    pub id: String,
    /// Original file name
    pub filename: String,
    /// Declared byte size
    pub size: u64,
    /// Declared media type
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Byte-content URL
    pub content: String,
    /// When the attachment was added
    pub created: DateTime<Utc>,
    /// Author of the attachment
    pub author: Author,
}

/// Author reference embedded in an attachment
#[derive(Clone, Debug, Deserialize)]
pub struct Author {
    /// Display name
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Stable key or username, depending on remote tracker version
    #[serde(alias = "key", alias = "name", default)]
    pub id: String,
}

/// A flattened attachment plus the issue context it was found on
///
/// This is what the orchestrator hands to the download pool — the pool
/// itself doesn't need the full issue record.
#[derive(Clone, Debug)]
pub struct AttachmentMeta {
    /// The attachment metadata record
    pub attachment: Attachment,
    /// The issue key this attachment belongs to
    pub issue_key: String,
    /// The project key of that issue
    pub project_key: String,
    /// The project display name of that issue
    pub project_name: String,
    /// The issue's workflow status name
    pub issue_status: String,
    /// The issue's workflow status category
    pub issue_status_category: String,
    /// The issue's last-updated timestamp
    pub issue_last_updated: DateTime<Utc>,
}

/// Flatten a single issue's attachments into [`AttachmentMeta`] records
///
/// This is the unit the orchestrator submits to the download pool: one
/// batch per issue, matching the spec's "attachments within a single issue
/// are all processed before the next issue's results are merged" ordering
/// guarantee.
pub fn flatten_issue(issue: &Issue) -> Vec<AttachmentMeta> {
    issue
        .fields
        .attachments
        .iter()
        .map(|attachment| AttachmentMeta {
            attachment: attachment.clone(),
            issue_key: issue.key.clone(),
            project_key: issue.fields.project.key.clone(),
            project_name: issue.fields.project.name.clone(),
            issue_status: issue.fields.status.name.clone(),
            issue_status_category: issue.fields.status.status_category.key.clone(),
            issue_last_updated: issue.fields.updated,
        })
        .collect()
}

/// Flatten a page of issues into one [`AttachmentMeta`] per attachment
pub fn flatten_page(page: &SearchPage) -> Vec<AttachmentMeta> {
    page.issues.iter().flat_map(flatten_issue).collect()
}

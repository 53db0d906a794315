//! Duplicate group persistence

use super::Store;
use crate::error::{Error, Result, StoreError};
use crate::types::{DuplicateGroup, Location, MAX_LOCATIONS_PER_GROUP};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;

#[derive(FromRow)]
struct GroupRow {
    fingerprint: String,
    file_name: String,
    file_size: i64,
    mime_type: String,
    canonical_issue_key: String,
    canonical_attachment_id: String,
    duplicate_count: i64,
    total_wasted_space: i64,
    author_name: String,
    author_id: String,
    created_at: DateTime<Utc>,
    issue_status: String,
    issue_status_category: String,
    issue_last_updated: DateTime<Utc>,
    locations_json: String,
}

impl TryFrom<GroupRow> for DuplicateGroup {
    type Error = Error;

    fn try_from(row: GroupRow) -> Result<Self> {
        let locations: Vec<Location> = serde_json::from_str(&row.locations_json)?;
        Ok(DuplicateGroup {
            fingerprint: row.fingerprint,
            file_name: row.file_name,
            file_size: row.file_size as u64,
            mime_type: row.mime_type,
            canonical_issue_key: row.canonical_issue_key,
            canonical_attachment_id: row.canonical_attachment_id,
            duplicate_count: row.duplicate_count as u64,
            total_wasted_space: row.total_wasted_space as u64,
            author_name: row.author_name,
            author_id: row.author_id,
            created_at: row.created_at,
            issue_status: row.issue_status,
            issue_status_category: row.issue_status_category,
            issue_last_updated: row.issue_last_updated,
            locations,
        })
    }
}

impl Store {
    /// Upsert every group in `groups`, inside an existing transaction
    ///
    /// `locations` is truncated to [`MAX_LOCATIONS_PER_GROUP`] on write; the
    /// in-memory caller is responsible for the same cap, this is a second
    /// line of defense against an oversized blob.
    pub(super) async fn upsert_groups_tx(
        tx: &mut sqlx::SqliteConnection,
        scan_id: &str,
        groups: &HashMap<String, DuplicateGroup>,
    ) -> Result<()> {
        for group in groups.values() {
            let capped_locations: Vec<&Location> = group.locations.iter().take(MAX_LOCATIONS_PER_GROUP).collect();
            let locations_json = serde_json::to_string(&capped_locations)?;

            sqlx::query(
                r#"
                INSERT INTO duplicate_groups
                    (scan_id, fingerprint, file_name, file_size, mime_type, canonical_issue_key,
                     canonical_attachment_id, duplicate_count, total_wasted_space, author_name, author_id,
                     created_at, issue_status, issue_status_category, issue_last_updated, locations_json)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(scan_id, fingerprint) DO UPDATE SET
                    file_name = excluded.file_name,
                    file_size = excluded.file_size,
                    mime_type = excluded.mime_type,
                    canonical_issue_key = excluded.canonical_issue_key,
                    canonical_attachment_id = excluded.canonical_attachment_id,
                    duplicate_count = excluded.duplicate_count,
                    total_wasted_space = excluded.total_wasted_space,
                    author_name = excluded.author_name,
                    author_id = excluded.author_id,
                    created_at = excluded.created_at,
                    issue_status = excluded.issue_status,
                    issue_status_category = excluded.issue_status_category,
                    issue_last_updated = excluded.issue_last_updated,
                    locations_json = excluded.locations_json
                "#,
            )
            .bind(scan_id)
            .bind(&group.fingerprint)
            .bind(&group.file_name)
            .bind(group.file_size as i64)
            .bind(&group.mime_type)
            .bind(&group.canonical_issue_key)
            .bind(&group.canonical_attachment_id)
            .bind(group.duplicate_count as i64)
            .bind(group.total_wasted_space as i64)
            .bind(&group.author_name)
            .bind(&group.author_id)
            .bind(group.created_at)
            .bind(&group.issue_status)
            .bind(&group.issue_status_category)
            .bind(group.issue_last_updated)
            .bind(locations_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to upsert duplicate group: {e}"))))?;
        }

        Ok(())
    }

    /// Fetch every duplicate group recorded for a scan
    pub async fn get_groups(&self, scan_id: &str) -> Result<HashMap<String, DuplicateGroup>> {
        let rows: Vec<GroupRow> = sqlx::query_as("SELECT * FROM duplicate_groups WHERE scan_id = ?")
            .bind(scan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to fetch duplicate groups: {e}"))))?;

        rows.into_iter()
            .map(|row| DuplicateGroup::try_from(row).map(|group| (group.fingerprint.clone(), group)))
            .collect()
    }

    /// The top-3 groups by wasted bytes among those with `duplicate_count > 0`
    pub async fn get_quick_wins(&self, scan_id: &str) -> Result<Vec<DuplicateGroup>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            "SELECT * FROM duplicate_groups WHERE scan_id = ? AND duplicate_count > 0 ORDER BY total_wasted_space DESC LIMIT 3",
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to fetch quick wins: {e}"))))?;

        rows.into_iter().map(DuplicateGroup::try_from).collect()
    }
}

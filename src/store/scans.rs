//! Scan record CRUD

use super::Store;
use crate::error::{Error, Result, StoreError};
use crate::types::{Scan, ScanStatus};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
struct ScanRow {
    id: String,
    status: String,
    total_issues: i64,
    processed_issues: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    predicate: String,
    config_snapshot: String,
}

impl TryFrom<ScanRow> for Scan {
    type Error = Error;

    fn try_from(row: ScanRow) -> Result<Self> {
        let status = ScanStatus::parse(&row.status)
            .ok_or_else(|| Error::Store(StoreError::QueryFailed(format!("invalid scan status: {}", row.status))))?;
        let config_snapshot = serde_json::from_str(&row.config_snapshot)?;

        Ok(Scan {
            id: row.id,
            status,
            total_issues: row.total_issues,
            processed_issues: row.processed_issues,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds,
            predicate: row.predicate,
            config_snapshot,
        })
    }
}

impl Store {
    /// Insert a fresh scan record
    pub async fn create_scan(&self, scan: &Scan) -> Result<()> {
        let config_snapshot = serde_json::to_string(&scan.config_snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO scans (id, status, total_issues, processed_issues, started_at, completed_at, duration_seconds, predicate, config_snapshot)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&scan.id)
        .bind(scan.status.as_str())
        .bind(scan.total_issues)
        .bind(scan.processed_issues)
        .bind(scan.started_at)
        .bind(scan.completed_at)
        .bind(scan.duration_seconds)
        .bind(&scan.predicate)
        .bind(config_snapshot)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to insert scan: {e}"))))?;

        Ok(())
    }

    /// Fetch a scan by id
    pub async fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>> {
        let row: Option<ScanRow> = sqlx::query_as("SELECT * FROM scans WHERE id = ?")
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to fetch scan: {e}"))))?;

        row.map(Scan::try_from).transpose()
    }

    /// List all scans, most recently started first
    pub async fn list_scans(&self) -> Result<Vec<Scan>> {
        let rows: Vec<ScanRow> = sqlx::query_as("SELECT * FROM scans ORDER BY started_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to list scans: {e}"))))?;

        rows.into_iter().map(Scan::try_from).collect()
    }

    /// Find the most recent scan still in `Running` status, if any
    pub async fn find_resumable_scan(&self) -> Result<Option<Scan>> {
        let row: Option<ScanRow> =
            sqlx::query_as("SELECT * FROM scans WHERE status = 'running' ORDER BY started_at DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to query resumable scan: {e}"))))?;

        row.map(Scan::try_from).transpose()
    }

    /// Mark a scan completed
    pub async fn complete_scan(&self, scan_id: &str, completed_at: DateTime<Utc>, duration_seconds: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE scans SET status = 'completed', completed_at = ?, duration_seconds = ? WHERE id = ?",
        )
        .bind(completed_at)
        .bind(duration_seconds)
        .bind(scan_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to complete scan: {e}"))))?;

        if result.rows_affected() == 0 {
            return Err(Error::Store(StoreError::NotFound(scan_id.to_string())));
        }
        Ok(())
    }

    /// Delete a scan and all dependent rows (statistics, groups, checkpoint)
    pub async fn delete_scan(&self, scan_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM scans WHERE id = ?")
            .bind(scan_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to delete scan: {e}"))))?;

        if result.rows_affected() == 0 {
            return Err(Error::Store(StoreError::NotFound(scan_id.to_string())));
        }
        Ok(())
    }

    /// Delete completed scans whose `completed_at` is older than `cutoff`
    pub async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM scans WHERE status = 'completed' AND completed_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to clean up scans: {e}"))))?;

        Ok(result.rows_affected())
    }
}

//! Rolling statistics persistence

use super::Store;
use crate::error::{Error, Result, StoreError};
use crate::types::ScanStatistics;
use sqlx::FromRow;

#[derive(FromRow)]
struct StatsRow {
    total_files: i64,
    total_size: i64,
    canonical_files: i64,
    duplicate_files: i64,
    duplicate_size: i64,
    project_stats_json: String,
    file_type_stats_json: String,
}

impl TryFrom<StatsRow> for ScanStatistics {
    type Error = Error;

    fn try_from(row: StatsRow) -> Result<Self> {
        Ok(ScanStatistics {
            total_files: row.total_files as u64,
            total_size: row.total_size as u64,
            canonical_files: row.canonical_files as u64,
            duplicate_files: row.duplicate_files as u64,
            duplicate_size: row.duplicate_size as u64,
            by_project: serde_json::from_str(&row.project_stats_json)?,
            by_extension: serde_json::from_str(&row.file_type_stats_json)?,
        })
    }
}

impl Store {
    /// Upsert the statistics row for a scan, inside an existing transaction
    pub(super) async fn upsert_stats_tx(
        tx: &mut sqlx::SqliteConnection,
        scan_id: &str,
        stats: &ScanStatistics,
    ) -> Result<()> {
        let project_stats_json = serde_json::to_string(&stats.by_project)?;
        let file_type_stats_json = serde_json::to_string(&stats.by_extension)?;

        sqlx::query(
            r#"
            INSERT INTO scan_statistics
                (scan_id, total_files, total_size, canonical_files, duplicate_files, duplicate_size, project_stats_json, file_type_stats_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(scan_id) DO UPDATE SET
                total_files = excluded.total_files,
                total_size = excluded.total_size,
                canonical_files = excluded.canonical_files,
                duplicate_files = excluded.duplicate_files,
                duplicate_size = excluded.duplicate_size,
                project_stats_json = excluded.project_stats_json,
                file_type_stats_json = excluded.file_type_stats_json
            "#,
        )
        .bind(scan_id)
        .bind(stats.total_files as i64)
        .bind(stats.total_size as i64)
        .bind(stats.canonical_files as i64)
        .bind(stats.duplicate_files as i64)
        .bind(stats.duplicate_size as i64)
        .bind(project_stats_json)
        .bind(file_type_stats_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to upsert scan statistics: {e}"))))?;

        Ok(())
    }

    /// Fetch the statistics row for a scan, defaulting to empty if absent
    pub async fn get_stats(&self, scan_id: &str) -> Result<ScanStatistics> {
        let row: Option<StatsRow> = sqlx::query_as("SELECT * FROM scan_statistics WHERE scan_id = ?")
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to fetch scan statistics: {e}"))))?;

        match row {
            Some(row) => ScanStatistics::try_from(row),
            None => Ok(ScanStatistics::default()),
        }
    }
}

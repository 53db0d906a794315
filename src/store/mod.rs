//! Durable SQLite persistence for scan state
//!
//! Mirrors the teacher's `db/` layout: one `Store` type whose methods are
//! organized by domain across submodules, a versioned migration runner, and
//! `sqlx` transactions for every multi-table write.
//!
//! ## Submodules
//!
//! - [`migrations`] — connection lifecycle, schema versioning
//! - [`scans`] — scan record CRUD
//! - [`stats`] — rolling statistics persistence
//! - [`groups`] — duplicate group persistence
//! - [`checkpoints`] — checkpoint read/write

use crate::error::{Error, Result, StoreError};
use crate::types::{DuplicateGroup, Scan, ScanStatistics};
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::path::Path;

mod checkpoints;
mod groups;
mod migrations;
mod scans;
mod stats;

/// A connected, migrated SQLite-backed store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if necessary) the database at `path` and run pending
    /// migrations
    pub async fn open(path: &Path) -> Result<Self> {
        Self::connect(path).await
    }

    /// Persist a scan's progress in one transaction: the scan row's
    /// `processed_issues`, rolling statistics, duplicate groups, and
    /// checkpoint all move together — this is the scan loop's write
    /// barrier, never torn across a crash.
    pub async fn save_progress(
        &self,
        scan: &Scan,
        stats: &ScanStatistics,
        groups: &HashMap<String, DuplicateGroup>,
        next_offset: i64,
        last_issue_key: Option<&str>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to begin transaction: {e}"))))?;

        sqlx::query("UPDATE scans SET processed_issues = ? WHERE id = ?")
            .bind(scan.processed_issues)
            .bind(&scan.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to update scan progress: {e}"))))?;

        Self::upsert_stats_tx(&mut tx, &scan.id, stats).await?;
        Self::upsert_groups_tx(&mut tx, &scan.id, groups).await?;
        Self::upsert_checkpoint_tx(&mut tx, &scan.id, next_offset, last_issue_key, chrono::Utc::now()).await?;

        tx.commit()
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to commit progress: {e}"))))?;

        Ok(())
    }

    /// Reset a scan to a fresh `Running` state with no progress, statistics,
    /// groups, or checkpoint — used by `--reset`
    pub async fn reset_scan(&self, scan_id: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to begin transaction: {e}"))))?;

        sqlx::query("UPDATE scans SET status = 'running', processed_issues = 0, completed_at = NULL, duration_seconds = NULL WHERE id = ?")
            .bind(scan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to reset scan: {e}"))))?;

        sqlx::query("DELETE FROM scan_statistics WHERE scan_id = ?")
            .bind(scan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to clear scan statistics: {e}"))))?;

        sqlx::query("DELETE FROM duplicate_groups WHERE scan_id = ?")
            .bind(scan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to clear duplicate groups: {e}"))))?;

        sqlx::query("DELETE FROM checkpoints WHERE scan_id = ?")
            .bind(scan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to clear checkpoint: {e}"))))?;

        tx.commit()
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to commit reset: {e}"))))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scan, ScanStatistics};
    use tempfile::tempdir;

    async fn open_temp_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("scan.db")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn open_creates_database_and_applies_migrations() {
        let (store, _dir) = open_temp_store().await;
        let scans = store.list_scans().await.unwrap();
        assert!(scans.is_empty());
    }

    #[tokio::test]
    async fn save_progress_is_atomic_across_scan_stats_and_checkpoint() {
        let (store, _dir) = open_temp_store().await;
        let mut scan = Scan::new("abcd1234".into(), 10, "created >= -7300d ORDER BY created DESC".into(), serde_json::json!({}));
        store.create_scan(&scan).await.unwrap();

        scan.processed_issues = 7;
        let stats = ScanStatistics::default();
        store
            .save_progress(&scan, &stats, &std::collections::HashMap::new(), 50, None)
            .await
            .unwrap();

        let reloaded = store.get_scan(&scan.id).await.unwrap().unwrap();
        assert_eq!(reloaded.processed_issues, 7);

        let checkpoint = store.get_checkpoint(&scan.id).await.unwrap().unwrap();
        assert_eq!(checkpoint.next_offset, 50);
    }

    #[tokio::test]
    async fn reset_scan_clears_progress_stats_groups_and_checkpoint() {
        let (store, _dir) = open_temp_store().await;
        let mut scan = Scan::new("abcd1234".into(), 10, "created >= -7300d ORDER BY created DESC".into(), serde_json::json!({}));
        store.create_scan(&scan).await.unwrap();
        scan.processed_issues = 5;
        store
            .save_progress(&scan, &ScanStatistics::default(), &std::collections::HashMap::new(), 5, Some("P-5"))
            .await
            .unwrap();

        store.reset_scan(&scan.id).await.unwrap();

        let reloaded = store.get_scan(&scan.id).await.unwrap().unwrap();
        assert_eq!(reloaded.processed_issues, 0);
        assert_eq!(reloaded.status, crate::types::ScanStatus::Running);
        assert!(store.get_checkpoint(&scan.id).await.unwrap().is_none());
    }
}

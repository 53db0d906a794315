//! Connection lifecycle and schema migrations

use super::Store;
use crate::error::{Error, StoreError};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;

impl Store {
    pub(super) async fn connect(path: &Path) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Store(StoreError::ConnectionFailed(format!(
                        "failed to create database directory: {e}"
                    )))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Store(StoreError::ConnectionFailed(format!("failed to parse database path: {e}"))))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Store(StoreError::ConnectionFailed(format!("failed to connect to database: {e}"))))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> crate::error::Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::Store(StoreError::ConnectionFailed(format!("failed to acquire connection: {e}"))))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to create schema_version table: {e}"))))?;

        let current_version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to query schema version: {e}"))))?;

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    async fn migrate_v1(conn: &mut SqliteConnection) -> crate::error::Result<()> {
        tracing::info!("applying database migration v1");

        sqlx::query(
            r#"
            CREATE TABLE scans (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                total_issues INTEGER NOT NULL,
                processed_issues INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                duration_seconds INTEGER,
                predicate TEXT NOT NULL,
                config_snapshot TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to create scans table: {e}"))))?;

        sqlx::query(
            r#"
            CREATE TABLE scan_statistics (
                scan_id TEXT PRIMARY KEY REFERENCES scans(id) ON DELETE CASCADE,
                total_files INTEGER NOT NULL,
                total_size INTEGER NOT NULL,
                canonical_files INTEGER NOT NULL,
                duplicate_files INTEGER NOT NULL,
                duplicate_size INTEGER NOT NULL,
                project_stats_json TEXT NOT NULL,
                file_type_stats_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to create scan_statistics table: {e}"))))?;

        sqlx::query(
            r#"
            CREATE TABLE duplicate_groups (
                scan_id TEXT NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
                fingerprint TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                canonical_issue_key TEXT NOT NULL,
                canonical_attachment_id TEXT NOT NULL,
                duplicate_count INTEGER NOT NULL,
                total_wasted_space INTEGER NOT NULL,
                author_name TEXT NOT NULL,
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                issue_status TEXT NOT NULL,
                issue_status_category TEXT NOT NULL,
                issue_last_updated TEXT NOT NULL,
                locations_json TEXT NOT NULL,
                PRIMARY KEY (scan_id, fingerprint)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to create duplicate_groups table: {e}"))))?;

        sqlx::query(
            r#"
            CREATE TABLE checkpoints (
                scan_id TEXT PRIMARY KEY REFERENCES scans(id) ON DELETE CASCADE,
                next_offset INTEGER NOT NULL,
                last_issue_key TEXT,
                checkpointed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to create checkpoints table: {e}"))))?;

        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (1, strftime('%s','now'))")
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Store(StoreError::MigrationFailed(format!("failed to record schema version: {e}"))))?;

        Ok(())
    }
}

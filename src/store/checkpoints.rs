//! Checkpoint read/write

use super::Store;
use crate::error::{Error, Result, StoreError};
use crate::types::Checkpoint;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
struct CheckpointRow {
    scan_id: String,
    next_offset: i64,
    last_issue_key: Option<String>,
    checkpointed_at: DateTime<Utc>,
}

impl From<CheckpointRow> for Checkpoint {
    fn from(row: CheckpointRow) -> Self {
        Checkpoint {
            scan_id: row.scan_id,
            next_offset: row.next_offset,
            last_issue_key: row.last_issue_key,
            checkpointed_at: row.checkpointed_at,
        }
    }
}

impl Store {
    /// Upsert the checkpoint row for a scan, inside an existing transaction
    pub(super) async fn upsert_checkpoint_tx(
        tx: &mut sqlx::SqliteConnection,
        scan_id: &str,
        next_offset: i64,
        last_issue_key: Option<&str>,
        checkpointed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkpoints (scan_id, next_offset, last_issue_key, checkpointed_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(scan_id) DO UPDATE SET
                next_offset = excluded.next_offset,
                last_issue_key = excluded.last_issue_key,
                checkpointed_at = excluded.checkpointed_at
            "#,
        )
        .bind(scan_id)
        .bind(next_offset)
        .bind(last_issue_key)
        .bind(checkpointed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to upsert checkpoint: {e}"))))?;

        Ok(())
    }

    /// Fetch the checkpoint for a scan, if one has been written
    pub async fn get_checkpoint(&self, scan_id: &str) -> Result<Option<Checkpoint>> {
        let row: Option<CheckpointRow> = sqlx::query_as("SELECT * FROM checkpoints WHERE scan_id = ?")
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Store(StoreError::QueryFailed(format!("failed to fetch checkpoint: {e}"))))?;

        Ok(row.map(Checkpoint::from))
    }
}

//! Sync audit repository
//!
//! One row per (direction, entity_type, entity_id): inserted on the first
//! attempt, updated in place on every later attempt. Rows are never deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain_leads::{SyncRecordRef, SyncStatus};

use crate::error::DatabaseError;

/// Database row for the `sync_tasks` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncTaskRow {
    pub id: Uuid,
    pub direction: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the sync audit trail
#[derive(Debug, Clone)]
pub struct SyncTaskRepository {
    pool: PgPool,
}

impl SyncTaskRepository {
    /// Creates a new SyncTaskRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records one attempt: insert on first sight, update afterwards
    pub async fn upsert_attempt(
        &self,
        record: &SyncRecordRef,
        status: SyncStatus,
        attempts: u32,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_tasks
                (id, direction, entity_type, entity_id, status, attempts, last_error,
                 created_at, updated_at)
            VALUES ($1, 'local_to_crm', $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (direction, entity_type, entity_id) DO UPDATE
            SET status = EXCLUDED.status,
                attempts = EXCLUDED.attempts,
                last_error = EXCLUDED.last_error,
                updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.entity_type.as_str())
        .bind(record.id)
        .bind(status.as_str())
        .bind(attempts as i32)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches the audit row for a record, if any attempt was recorded
    pub async fn fetch(
        &self,
        record: &SyncRecordRef,
    ) -> Result<Option<SyncTaskRow>, DatabaseError> {
        let row = sqlx::query_as::<_, SyncTaskRow>(
            r#"
            SELECT id, direction, entity_type, entity_id, status, attempts, last_error,
                   created_at, updated_at
            FROM sync_tasks
            WHERE direction = 'local_to_crm' AND entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(record.entity_type.as_str())
        .bind(record.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

//! Lead repository implementation
//!
//! Database access for the `contacts` and `consultations` tables, including
//! the sync-eligibility scan and the single-row status transitions the sync
//! engine relies on.
//!
//! # Claim semantics
//!
//! `claim_*` is a conditional UPDATE: it flips an eligible row to
//! `in_progress` and reports whether this caller won. Because the condition
//! and the write are one statement, two racing sync paths cannot both claim
//! the same row. A crashed attempt leaves the row `in_progress`; rows whose
//! claim is older than the stale cutoff re-enter the eligibility scan.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain_leads::{Consultation, Contact};

use crate::error::DatabaseError;

/// Database row for the `contacts` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub sync_status: String,
    pub sync_attempts: i32,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for the `consultations` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsultationRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub sync_status: String,
    pub sync_attempts: i32,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn sync_state_from_parts(
    status: &str,
    attempts: i32,
    last_attempt_at: Option<DateTime<Utc>>,
    error: Option<String>,
) -> Result<domain_leads::SyncState, DatabaseError> {
    Ok(domain_leads::SyncState {
        status: status
            .parse()
            .map_err(|e| DatabaseError::SerializationError(format!("{e}")))?,
        attempts: u32::try_from(attempts)
            .map_err(|_| DatabaseError::SerializationError(format!(
                "negative attempt count {attempts}"
            )))?,
        last_attempt_at,
        last_error: error,
    })
}

impl TryFrom<ContactRow> for Contact {
    type Error = DatabaseError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let sync = sync_state_from_parts(
            &row.sync_status,
            row.sync_attempts,
            row.last_sync_attempt_at,
            row.sync_error,
        )?;
        Ok(Contact {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            notes: row.notes,
            sync,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ConsultationRow> for Consultation {
    type Error = DatabaseError;

    fn try_from(row: ConsultationRow) -> Result<Self, Self::Error> {
        let sync = sync_state_from_parts(
            &row.sync_status,
            row.sync_attempts,
            row.last_sync_attempt_at,
            row.sync_error,
        )?;
        Ok(Consultation {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            notes: row.notes,
            preferred_date: row.preferred_date,
            preferred_time: row.preferred_time,
            sync,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for contact and consultation records
#[derive(Debug, Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    /// Creates a new LeadRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new contact row
    pub async fn insert_contact(&self, contact: &Contact) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO contacts
                (id, name, email, phone, notes,
                 sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(contact.id.as_uuid())
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.notes)
        .bind(contact.sync.status.as_str())
        .bind(contact.sync.attempts as i32)
        .bind(contact.sync.last_attempt_at)
        .bind(&contact.sync.last_error)
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a new consultation row
    pub async fn insert_consultation(
        &self,
        consultation: &Consultation,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO consultations
                (id, name, email, phone, notes, preferred_date, preferred_time,
                 sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(consultation.id.as_uuid())
        .bind(&consultation.name)
        .bind(&consultation.email)
        .bind(&consultation.phone)
        .bind(&consultation.notes)
        .bind(consultation.preferred_date)
        .bind(consultation.preferred_time)
        .bind(consultation.sync.status.as_str())
        .bind(consultation.sync.attempts as i32)
        .bind(consultation.sync.last_attempt_at)
        .bind(&consultation.sync.last_error)
        .bind(consultation.created_at)
        .bind(consultation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a contact by id
    pub async fn fetch_contact(&self, id: Uuid) -> Result<Option<ContactRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, email, phone, notes,
                   sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                   created_at, updated_at
            FROM contacts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Fetches a consultation by id
    pub async fn fetch_consultation(
        &self,
        id: Uuid,
    ) -> Result<Option<ConsultationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ConsultationRow>(
            r#"
            SELECT id, name, email, phone, notes, preferred_date, preferred_time,
                   sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                   created_at, updated_at
            FROM consultations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Scans contacts eligible for sync, oldest-attempted first
    ///
    /// Includes stale in-progress claims (updated before `stale_before`).
    pub async fn list_pending_contacts(
        &self,
        limit: i64,
        max_attempts: i32,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<ContactRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, email, phone, notes,
                   sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                   created_at, updated_at
            FROM contacts
            WHERE sync_attempts < $1
              AND (sync_status IN ('pending', 'failed')
                   OR (sync_status = 'in_progress' AND updated_at < $2))
            ORDER BY last_sync_attempt_at ASC NULLS FIRST
            LIMIT $3
            "#,
        )
        .bind(max_attempts)
        .bind(stale_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Scans consultations eligible for sync, oldest-attempted first
    pub async fn list_pending_consultations(
        &self,
        limit: i64,
        max_attempts: i32,
        stale_before: DateTime<Utc>,
    ) -> Result<Vec<ConsultationRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ConsultationRow>(
            r#"
            SELECT id, name, email, phone, notes, preferred_date, preferred_time,
                   sync_status, sync_attempts, last_sync_attempt_at, sync_error,
                   created_at, updated_at
            FROM consultations
            WHERE sync_attempts < $1
              AND (sync_status IN ('pending', 'failed')
                   OR (sync_status = 'in_progress' AND updated_at < $2))
            ORDER BY last_sync_attempt_at ASC NULLS FIRST
            LIMIT $3
            "#,
        )
        .bind(max_attempts)
        .bind(stale_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Atomically claims a contact for a sync attempt
    ///
    /// Returns true when this caller flipped the row to `in_progress`.
    pub async fn claim_contact(
        &self,
        id: Uuid,
        max_attempts: i32,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET sync_status = 'in_progress', updated_at = now()
            WHERE id = $1
              AND sync_attempts < $2
              AND (sync_status IN ('pending', 'failed')
                   OR (sync_status = 'in_progress' AND updated_at < $3))
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically claims a consultation for a sync attempt
    pub async fn claim_consultation(
        &self,
        id: Uuid,
        max_attempts: i32,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE consultations
            SET sync_status = 'in_progress', updated_at = now()
            WHERE id = $1
              AND sync_attempts < $2
              AND (sync_status IN ('pending', 'failed')
                   OR (sync_status = 'in_progress' AND updated_at < $3))
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks a contact synced (terminal)
    pub async fn mark_contact_synced(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET sync_status = 'synced',
                sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = now(),
                sync_error = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Contact", id));
        }
        Ok(())
    }

    /// Marks a consultation synced (terminal)
    pub async fn mark_consultation_synced(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE consultations
            SET sync_status = 'synced',
                sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = now(),
                sync_error = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Consultation", id));
        }
        Ok(())
    }

    /// Marks a contact failed and records the error text
    pub async fn mark_contact_failed(
        &self,
        id: Uuid,
        message: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET sync_status = 'failed',
                sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = now(),
                sync_error = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Contact", id));
        }
        Ok(())
    }

    /// Marks a consultation failed and records the error text
    pub async fn mark_consultation_failed(
        &self,
        id: Uuid,
        message: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE consultations
            SET sync_status = 'failed',
                sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = now(),
                sync_error = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Consultation", id));
        }
        Ok(())
    }
}

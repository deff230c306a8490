//! PostgreSQL Lead Store Adapter
//!
//! This module provides the internal (database) adapter for the lead-capture
//! domain, implementing the `LeadStorePort` trait using PostgreSQL via the
//! repositories.
//!
//! # Overview
//!
//! The `PostgresLeadStore` serves as the bridge between the domain layer's
//! port interface and the database layer. It:
//!
//! - Validates submissions before they enter the sync queue
//! - Converts database row types back to domain models
//! - Handles error translation between database and port errors
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - `DatabaseError::NotFound` -> `PortError::NotFound`
//! - connection-level failures -> `PortError::Connection`
//! - everything else -> `PortError::Internal`

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    AdapterHealth, ConsultationId, ContactId, DomainPort, HealthCheckResult, HealthCheckable,
    PortError,
};
use domain_leads::{
    Consultation, Contact, LeadStorePort, NewConsultation, NewContact, PendingRecord,
    SubmissionValidator, SyncEntityType, SyncRecordRef, SyncStatus,
};

use crate::error::DatabaseError;
use crate::repositories::{LeadRepository, SyncTaskRepository};

/// How long an in-progress claim may sit before it is considered abandoned
const STALE_CLAIM_MINUTES: i64 = 10;

/// PostgreSQL-backed implementation of the LeadStorePort trait
#[derive(Debug, Clone)]
pub struct PostgresLeadStore {
    leads: LeadRepository,
    sync_tasks: SyncTaskRepository,
    pool: PgPool,
}

impl PostgresLeadStore {
    /// Creates a new PostgreSQL lead store
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            leads: LeadRepository::new(pool.clone()),
            sync_tasks: SyncTaskRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying lead repository
    ///
    /// Useful for operations not exposed through the port trait, such as
    /// reporting queries.
    pub fn repository(&self) -> &LeadRepository {
        &self.leads
    }

    /// Returns a reference to the sync audit repository
    pub fn sync_task_repository(&self) -> &SyncTaskRepository {
        &self.sync_tasks
    }

    fn stale_cutoff() -> chrono::DateTime<Utc> {
        Utc::now() - Duration::minutes(STALE_CLAIM_MINUTES)
    }

    fn to_port_error(entity: &str, id: impl std::fmt::Display, error: DatabaseError) -> PortError {
        if error.is_not_found() {
            PortError::not_found(entity, id)
        } else if error.is_connection_error() {
            PortError::Connection {
                message: error.to_string(),
                source: Some(Box::new(error)),
            }
        } else {
            PortError::Internal {
                message: format!("database operation on {entity} failed"),
                source: Some(Box::new(error)),
            }
        }
    }
}

impl DomainPort for PostgresLeadStore {}

#[async_trait]
impl HealthCheckable for PostgresLeadStore {
    /// Checks database connectivity
    ///
    /// Performs a simple SELECT 1 query to verify the connection pool
    /// is operational and the database is responsive.
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-lead-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-lead-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl LeadStorePort for PostgresLeadStore {
    #[instrument(skip(self, payload))]
    async fn create_contact(&self, payload: NewContact) -> Result<Contact, PortError> {
        let result = SubmissionValidator::validate_contact(&payload);
        if !result.is_valid {
            return Err(PortError::validation(result.errors.join("; ")));
        }

        let contact = Contact::new(payload);
        self.leads
            .insert_contact(&contact)
            .await
            .map_err(|e| Self::to_port_error("Contact", contact.id, e))?;
        Ok(contact)
    }

    #[instrument(skip(self, payload))]
    async fn create_consultation(
        &self,
        payload: NewConsultation,
    ) -> Result<Consultation, PortError> {
        let result = SubmissionValidator::validate_consultation(&payload);
        if !result.is_valid {
            return Err(PortError::validation(result.errors.join("; ")));
        }

        let consultation = Consultation::new(payload);
        self.leads
            .insert_consultation(&consultation)
            .await
            .map_err(|e| Self::to_port_error("Consultation", consultation.id, e))?;
        Ok(consultation)
    }

    #[instrument(skip(self), fields(contact_id = %id))]
    async fn get_contact(&self, id: ContactId) -> Result<Contact, PortError> {
        let row = self
            .leads
            .fetch_contact(*id.as_uuid())
            .await
            .map_err(|e| Self::to_port_error("Contact", id, e))?
            .ok_or_else(|| PortError::not_found("Contact", id))?;

        row.try_into()
            .map_err(|e| Self::to_port_error("Contact", id, e))
    }

    #[instrument(skip(self), fields(consultation_id = %id))]
    async fn get_consultation(&self, id: ConsultationId) -> Result<Consultation, PortError> {
        let row = self
            .leads
            .fetch_consultation(*id.as_uuid())
            .await
            .map_err(|e| Self::to_port_error("Consultation", id, e))?
            .ok_or_else(|| PortError::not_found("Consultation", id))?;

        row.try_into()
            .map_err(|e| Self::to_port_error("Consultation", id, e))
    }

    #[instrument(skip(self))]
    async fn list_pending(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<PendingRecord>, PortError> {
        let stale_before = Self::stale_cutoff();
        let limit = i64::from(limit);
        let max_attempts = max_attempts as i32;

        let contacts = self
            .leads
            .list_pending_contacts(limit, max_attempts, stale_before)
            .await
            .map_err(|e| Self::to_port_error("Contact", "pending-scan", e))?;
        let consultations = self
            .leads
            .list_pending_consultations(limit, max_attempts, stale_before)
            .await
            .map_err(|e| Self::to_port_error("Consultation", "pending-scan", e))?;

        let mut records = Vec::with_capacity(contacts.len() + consultations.len());
        for row in contacts {
            let contact: Contact = row
                .try_into()
                .map_err(|e| Self::to_port_error("Contact", "pending-scan", e))?;
            records.push(PendingRecord::Contact(contact));
        }
        for row in consultations {
            let consultation: Consultation = row
                .try_into()
                .map_err(|e| Self::to_port_error("Consultation", "pending-scan", e))?;
            records.push(PendingRecord::Consultation(consultation));
        }

        // Each table is already ordered; merge the two and re-bound.
        records.sort_by_key(|record| {
            let sync = record.sync();
            (sync.last_attempt_at.is_some(), sync.last_attempt_at)
        });
        records.truncate(limit as usize);

        Ok(records)
    }

    #[instrument(skip(self), fields(record = %record))]
    async fn claim(&self, record: &SyncRecordRef, max_attempts: u32) -> Result<bool, PortError> {
        let stale_before = Self::stale_cutoff();
        let max_attempts = max_attempts as i32;

        let claimed = match record.entity_type {
            SyncEntityType::Contact => {
                self.leads
                    .claim_contact(record.id, max_attempts, stale_before)
                    .await
            }
            SyncEntityType::Consultation => {
                self.leads
                    .claim_consultation(record.id, max_attempts, stale_before)
                    .await
            }
        }
        .map_err(|e| Self::to_port_error(record.entity_type.as_str(), record.id, e))?;

        Ok(claimed)
    }

    #[instrument(skip(self), fields(record = %record))]
    async fn mark_synced(&self, record: &SyncRecordRef) -> Result<(), PortError> {
        match record.entity_type {
            SyncEntityType::Contact => self.leads.mark_contact_synced(record.id).await,
            SyncEntityType::Consultation => self.leads.mark_consultation_synced(record.id).await,
        }
        .map_err(|e| Self::to_port_error(record.entity_type.as_str(), record.id, e))
    }

    #[instrument(skip(self, message), fields(record = %record))]
    async fn mark_failed(&self, record: &SyncRecordRef, message: &str) -> Result<(), PortError> {
        match record.entity_type {
            SyncEntityType::Contact => self.leads.mark_contact_failed(record.id, message).await,
            SyncEntityType::Consultation => {
                self.leads.mark_consultation_failed(record.id, message).await
            }
        }
        .map_err(|e| Self::to_port_error(record.entity_type.as_str(), record.id, e))
    }

    #[instrument(skip(self, error), fields(record = %record))]
    async fn record_sync_attempt(
        &self,
        record: &SyncRecordRef,
        status: SyncStatus,
        attempts: u32,
        error: Option<&str>,
    ) -> Result<(), PortError> {
        self.sync_tasks
            .upsert_attempt(record, status, attempts, error)
            .await
            .map_err(|e| Self::to_port_error("SyncTask", record.id, e))
    }
}

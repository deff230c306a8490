//! Lead Domain Ports
//!
//! This module defines the port interfaces for the lead-capture domain,
//! enabling swappable implementations (internal database, external CRM,
//! mock, etc.).
//!
//! # Architecture
//!
//! Two ports cover the domain's dependencies:
//!
//! - **`LeadStorePort`**: the durable record store. Owns persistence and the
//!   sync-status transitions. Implemented by `PostgresLeadStore` (infra_db)
//!   and by the in-memory `MockLeadStore` here.
//! - **`CrmPort`**: the external CRM. Owns the authentication session and the
//!   remote API dialect. Implemented by `LegacyCrmClient` (adapters) and by
//!   the in-memory `ScriptedCrm` here.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_leads::ports::{LeadStorePort, CrmPort};
//! use std::sync::Arc;
//!
//! pub struct SyncEngine {
//!     store: Arc<dyn LeadStorePort>,
//!     crm: Arc<dyn CrmPort>,
//! }
//! ```
//!
//! Adapters are chosen at application startup; tests wire the mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{ConsultationId, ContactId, DomainPort, HealthCheckable, PortError};

use crate::lead::{
    Consultation, Contact, NewConsultation, NewContact, PendingRecord, SyncRecordRef, SyncStatus,
};

/// Canonical contact payload handed to the CRM client
///
/// Canonicalization of upstream field-name variants (camelCase aliases and
/// the like) happens before this struct is built; the CRM client only ever
/// accepts this one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmContactData {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
}

impl From<&Contact> for CrmContactData {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            notes: contact.notes.clone(),
        }
    }
}

/// Canonical consultation payload handed to the CRM client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmConsultationData {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub preferred_date: Option<chrono::NaiveDate>,
    pub preferred_time: Option<chrono::NaiveTime>,
}

impl CrmConsultationData {
    /// The meeting slot, when the visitor supplied both a date and a time
    pub fn meeting_slot(&self) -> Option<chrono::NaiveDateTime> {
        match (self.preferred_date, self.preferred_time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

impl From<&Consultation> for CrmConsultationData {
    fn from(consultation: &Consultation) -> Self {
        Self {
            name: consultation.name.clone(),
            email: consultation.email.clone(),
            phone: consultation.phone.clone(),
            notes: consultation.notes.clone(),
            preferred_date: consultation.preferred_date,
            preferred_time: consultation.preferred_time,
        }
    }
}

/// Result of one logical CRM operation
///
/// Expected CRM-side rejections (validation failures and the like) are
/// reported as `Rejected`, never as an `Err`, so the caller can decide what
/// to do; `Err(PortError)` is reserved for authentication, transport, and
/// availability failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote record was created
    Created { remote_id: String },
    /// The CRM accepted the call but rejected the operation
    Rejected { message: String },
}

/// Status of a single endpoint probe in a connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStatus {
    /// Endpoint name (e.g. "login", "contacts_module")
    pub name: String,
    /// HTTP status code, when a response was received
    pub status: Option<u16>,
    /// Human-readable status line
    pub status_text: String,
    /// Error detail, when the probe failed
    pub error: Option<String>,
}

/// Aggregated result of a CRM connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    pub endpoints: Vec<EndpointStatus>,
}

/// The durable record store contract (Record Store)
///
/// Implementations own persistence and the sync-status transitions. All
/// mutations are single-row operations; `claim` is the atomic
/// `pending|failed -> in_progress` flip that serializes concurrent sync
/// attempts on the same record.
#[async_trait]
pub trait LeadStorePort: DomainPort + HealthCheckable {
    /// Stores a new contact enquiry in the pending state
    ///
    /// # Errors
    ///
    /// `PortError::Validation` if name, email, or phone is missing/blank.
    async fn create_contact(&self, payload: NewContact) -> Result<Contact, PortError>;

    /// Stores a new consultation request in the pending state
    async fn create_consultation(
        &self,
        payload: NewConsultation,
    ) -> Result<Consultation, PortError>;

    /// Fetches a contact by ID, or `PortError::NotFound`
    async fn get_contact(&self, id: ContactId) -> Result<Contact, PortError>;

    /// Fetches a consultation by ID, or `PortError::NotFound`
    async fn get_consultation(&self, id: ConsultationId) -> Result<Consultation, PortError>;

    /// Returns up to `limit` sync-eligible records across both entity kinds
    ///
    /// Eligible means not synced and under `max_attempts`, plus stale
    /// in-progress claims (older than the store's stale-claim timeout).
    /// Ordered oldest-attempted first; never-attempted records sort first.
    async fn list_pending(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<PendingRecord>, PortError>;

    /// Atomically claims a record for one sync attempt
    ///
    /// Returns `true` if this caller won the claim, `false` if the record is
    /// no longer eligible (already claimed, synced, or over the ceiling).
    async fn claim(&self, record: &SyncRecordRef, max_attempts: u32) -> Result<bool, PortError>;

    /// Marks a record synced: increments attempts, stamps the attempt time,
    /// clears the stored error. Terminal.
    async fn mark_synced(&self, record: &SyncRecordRef) -> Result<(), PortError>;

    /// Marks a record failed: increments attempts, stamps the attempt time,
    /// records the error message.
    async fn mark_failed(&self, record: &SyncRecordRef, message: &str) -> Result<(), PortError>;

    /// Upserts the audit row for a sync attempt
    ///
    /// Creates the row on the first attempt for this record/direction pair,
    /// updates it in place afterwards.
    async fn record_sync_attempt(
        &self,
        record: &SyncRecordRef,
        status: SyncStatus,
        attempts: u32,
        error: Option<&str>,
    ) -> Result<(), PortError>;
}

/// The CRM client contract (CRM Client)
///
/// Implementations own the authentication session lifecycle and the remote
/// API dialect; callers never see or supply session state.
#[async_trait]
pub trait CrmPort: DomainPort {
    /// Creates a contact record in the CRM
    async fn create_contact(&self, data: &CrmContactData) -> Result<SyncOutcome, PortError>;

    /// Creates a consultation in the CRM: parent account, contact record,
    /// and (when a preferred slot was supplied) a linked meeting
    async fn create_consultation_meeting(
        &self,
        data: &CrmConsultationData,
    ) -> Result<SyncOutcome, PortError>;

    /// Probes the CRM endpoints and reports per-endpoint status
    async fn test_connection(&self) -> ConnectionReport;
}

/// In-memory mock implementations for testing
///
/// `MockLeadStore` mirrors the Postgres adapter's transition semantics
/// (claim atomicity, attempt counting, eligibility ordering) without a
/// database. `ScriptedCrm` plays back a configured sequence of outcomes and
/// counts calls.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};
    use uuid::Uuid;

    use core_kernel::{AdapterHealth, HealthCheckResult};

    use crate::lead::SyncEntityType;
    use crate::sync_task::SyncTask;
    use crate::validation::SubmissionValidator;

    const DEFAULT_STALE_CLAIM_MINUTES: i64 = 10;

    /// In-memory implementation of `LeadStorePort`
    #[derive(Debug)]
    pub struct MockLeadStore {
        contacts: Arc<RwLock<HashMap<Uuid, Contact>>>,
        consultations: Arc<RwLock<HashMap<Uuid, Consultation>>>,
        sync_tasks: Arc<RwLock<HashMap<(SyncEntityType, Uuid), SyncTask>>>,
        stale_claim_timeout: Duration,
    }

    impl MockLeadStore {
        /// Creates an empty mock store
        pub fn new() -> Self {
            Self {
                contacts: Arc::new(RwLock::new(HashMap::new())),
                consultations: Arc::new(RwLock::new(HashMap::new())),
                sync_tasks: Arc::new(RwLock::new(HashMap::new())),
                stale_claim_timeout: Duration::minutes(DEFAULT_STALE_CLAIM_MINUTES),
            }
        }

        /// Overrides the stale-claim timeout (for claim-recovery tests)
        pub fn with_stale_claim_timeout(mut self, timeout: Duration) -> Self {
            self.stale_claim_timeout = timeout;
            self
        }

        /// Returns the audit row for a record, if any attempt was recorded
        pub async fn sync_task(&self, record: &SyncRecordRef) -> Option<SyncTask> {
            self.sync_tasks
                .read()
                .await
                .get(&(record.entity_type, record.id))
                .cloned()
        }

        /// Test hook: backdates a record's claim so it reads as stale
        pub async fn backdate_claim(&self, record: &SyncRecordRef, age: Duration) {
            let stamp = Utc::now() - age;
            match record.entity_type {
                SyncEntityType::Contact => {
                    if let Some(contact) = self.contacts.write().await.get_mut(&record.id) {
                        contact.updated_at = stamp;
                    }
                }
                SyncEntityType::Consultation => {
                    if let Some(consultation) =
                        self.consultations.write().await.get_mut(&record.id)
                    {
                        consultation.updated_at = stamp;
                    }
                }
            }
        }

        fn eligible(&self, sync: &crate::lead::SyncState, updated_at: DateTime<Utc>, max_attempts: u32) -> bool {
            if sync.is_eligible(max_attempts) {
                return true;
            }
            // Stale claim recovery: an in-progress record whose claim is old
            // enough re-enters the scan.
            sync.status == SyncStatus::InProgress
                && sync.attempts < max_attempts
                && updated_at < Utc::now() - self.stale_claim_timeout
        }

        async fn with_sync_state<F>(
            &self,
            record: &SyncRecordRef,
            apply: F,
        ) -> Result<(), PortError>
        where
            F: FnOnce(&mut crate::lead::SyncState),
        {
            match record.entity_type {
                SyncEntityType::Contact => {
                    let mut contacts = self.contacts.write().await;
                    let contact = contacts
                        .get_mut(&record.id)
                        .ok_or_else(|| PortError::not_found("Contact", record.id))?;
                    apply(&mut contact.sync);
                    contact.updated_at = Utc::now();
                }
                SyncEntityType::Consultation => {
                    let mut consultations = self.consultations.write().await;
                    let consultation = consultations
                        .get_mut(&record.id)
                        .ok_or_else(|| PortError::not_found("Consultation", record.id))?;
                    apply(&mut consultation.sync);
                    consultation.updated_at = Utc::now();
                }
            }
            Ok(())
        }
    }

    impl Default for MockLeadStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl DomainPort for MockLeadStore {}

    #[async_trait]
    impl HealthCheckable for MockLeadStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-lead-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl LeadStorePort for MockLeadStore {
        async fn create_contact(&self, payload: NewContact) -> Result<Contact, PortError> {
            let result = SubmissionValidator::validate_contact(&payload);
            if !result.is_valid {
                return Err(PortError::validation(result.errors.join("; ")));
            }

            let contact = Contact::new(payload);
            self.contacts
                .write()
                .await
                .insert(*contact.id.as_uuid(), contact.clone());
            Ok(contact)
        }

        async fn create_consultation(
            &self,
            payload: NewConsultation,
        ) -> Result<Consultation, PortError> {
            let result = SubmissionValidator::validate_consultation(&payload);
            if !result.is_valid {
                return Err(PortError::validation(result.errors.join("; ")));
            }

            let consultation = Consultation::new(payload);
            self.consultations
                .write()
                .await
                .insert(*consultation.id.as_uuid(), consultation.clone());
            Ok(consultation)
        }

        async fn get_contact(&self, id: ContactId) -> Result<Contact, PortError> {
            self.contacts
                .read()
                .await
                .get(id.as_uuid())
                .cloned()
                .ok_or_else(|| PortError::not_found("Contact", id))
        }

        async fn get_consultation(&self, id: ConsultationId) -> Result<Consultation, PortError> {
            self.consultations
                .read()
                .await
                .get(id.as_uuid())
                .cloned()
                .ok_or_else(|| PortError::not_found("Consultation", id))
        }

        async fn list_pending(
            &self,
            limit: u32,
            max_attempts: u32,
        ) -> Result<Vec<PendingRecord>, PortError> {
            let mut records: Vec<PendingRecord> = Vec::new();

            for contact in self.contacts.read().await.values() {
                if self.eligible(&contact.sync, contact.updated_at, max_attempts) {
                    records.push(PendingRecord::Contact(contact.clone()));
                }
            }
            for consultation in self.consultations.read().await.values() {
                if self.eligible(&consultation.sync, consultation.updated_at, max_attempts) {
                    records.push(PendingRecord::Consultation(consultation.clone()));
                }
            }

            // Oldest-attempted first; never-attempted records sort before all.
            records.sort_by_key(|record| {
                let sync = record.sync();
                (sync.last_attempt_at.is_some(), sync.last_attempt_at)
            });
            records.truncate(limit as usize);

            Ok(records)
        }

        async fn claim(
            &self,
            record: &SyncRecordRef,
            max_attempts: u32,
        ) -> Result<bool, PortError> {
            // The whole check-and-flip runs under the store's write lock,
            // which is what makes the claim atomic in this implementation.
            let stale_timeout = self.stale_claim_timeout;
            let now = Utc::now();
            let try_claim = move |sync: &mut crate::lead::SyncState,
                                  updated_at: &mut DateTime<Utc>|
                  -> bool {
                let stale_reclaim = sync.status == SyncStatus::InProgress
                    && sync.attempts < max_attempts
                    && *updated_at < now - stale_timeout;
                if sync.is_eligible(max_attempts) || stale_reclaim {
                    sync.status = SyncStatus::InProgress;
                    *updated_at = now;
                    true
                } else {
                    false
                }
            };

            match record.entity_type {
                SyncEntityType::Contact => {
                    let mut contacts = self.contacts.write().await;
                    let contact = contacts
                        .get_mut(&record.id)
                        .ok_or_else(|| PortError::not_found("Contact", record.id))?;
                    Ok(try_claim(&mut contact.sync, &mut contact.updated_at))
                }
                SyncEntityType::Consultation => {
                    let mut consultations = self.consultations.write().await;
                    let consultation = consultations
                        .get_mut(&record.id)
                        .ok_or_else(|| PortError::not_found("Consultation", record.id))?;
                    Ok(try_claim(&mut consultation.sync, &mut consultation.updated_at))
                }
            }
        }

        async fn mark_synced(&self, record: &SyncRecordRef) -> Result<(), PortError> {
            self.with_sync_state(record, |sync| {
                sync.status = SyncStatus::Synced;
                sync.attempts += 1;
                sync.last_attempt_at = Some(Utc::now());
                sync.last_error = None;
            })
            .await
        }

        async fn mark_failed(
            &self,
            record: &SyncRecordRef,
            message: &str,
        ) -> Result<(), PortError> {
            let message = message.to_string();
            self.with_sync_state(record, move |sync| {
                sync.status = SyncStatus::Failed;
                sync.attempts += 1;
                sync.last_attempt_at = Some(Utc::now());
                sync.last_error = Some(message);
            })
            .await
        }

        async fn record_sync_attempt(
            &self,
            record: &SyncRecordRef,
            status: SyncStatus,
            attempts: u32,
            error: Option<&str>,
        ) -> Result<(), PortError> {
            let mut tasks = self.sync_tasks.write().await;
            match tasks.get_mut(&(record.entity_type, record.id)) {
                Some(task) => {
                    task.record_attempt(status, attempts, error.map(str::to_string));
                }
                None => {
                    tasks.insert(
                        (record.entity_type, record.id),
                        SyncTask::first_attempt(
                            record.entity_type,
                            record.id,
                            status,
                            error.map(str::to_string),
                        ),
                    );
                }
            }
            Ok(())
        }
    }

    /// One scripted CRM response
    #[derive(Debug, Clone)]
    pub enum ScriptedResponse {
        /// Operation succeeds; a remote id is generated from the call count
        Created,
        /// CRM-side rejection (reported as `SyncOutcome::Rejected`)
        Rejected(String),
        /// Transport failure (reported as `PortError::Connection`)
        TransportError(String),
        /// Authentication failure (reported as `PortError::Unauthorized`)
        AuthError(String),
    }

    /// Scripted implementation of `CrmPort`
    ///
    /// Plays back a queue of responses, then repeats a fallback. Counts
    /// every operation call so tests can assert exactly how many CRM calls
    /// a scenario produced.
    #[derive(Debug)]
    pub struct ScriptedCrm {
        script: Mutex<VecDeque<ScriptedResponse>>,
        fallback: ScriptedResponse,
        calls: AtomicUsize,
        reachable: bool,
    }

    impl ScriptedCrm {
        /// A CRM that accepts everything
        pub fn always_succeeds() -> Self {
            Self::with_script(Vec::new(), ScriptedResponse::Created)
        }

        /// A CRM that rejects everything with the given message
        pub fn always_fails(message: impl Into<String>) -> Self {
            Self::with_script(Vec::new(), ScriptedResponse::Rejected(message.into()))
        }

        /// Plays `script` in order, then repeats `fallback`
        pub fn with_script(script: Vec<ScriptedResponse>, fallback: ScriptedResponse) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
                reachable: true,
            }
        }

        /// Makes `test_connection` report an unreachable server
        pub fn unreachable(mut self) -> Self {
            self.reachable = false;
            self
        }

        /// Number of CRM operation calls made so far
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self) -> Result<SyncOutcome, PortError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let response = self
                .script
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            match response {
                ScriptedResponse::Created => Ok(SyncOutcome::Created {
                    remote_id: format!("crm-{call}"),
                }),
                ScriptedResponse::Rejected(message) => Ok(SyncOutcome::Rejected { message }),
                ScriptedResponse::TransportError(message) => Err(PortError::connection(message)),
                ScriptedResponse::AuthError(message) => Err(PortError::unauthorized(message)),
            }
        }
    }

    impl DomainPort for ScriptedCrm {}

    #[async_trait]
    impl CrmPort for ScriptedCrm {
        async fn create_contact(&self, _data: &CrmContactData) -> Result<SyncOutcome, PortError> {
            self.respond().await
        }

        async fn create_consultation_meeting(
            &self,
            _data: &CrmConsultationData,
        ) -> Result<SyncOutcome, PortError> {
            self.respond().await
        }

        async fn test_connection(&self) -> ConnectionReport {
            if self.reachable {
                ConnectionReport {
                    success: true,
                    message: "All endpoints reachable".to_string(),
                    endpoints: vec![EndpointStatus {
                        name: "login".to_string(),
                        status: Some(200),
                        status_text: "OK".to_string(),
                        error: None,
                    }],
                }
            } else {
                ConnectionReport {
                    success: false,
                    message: "CRM unreachable".to_string(),
                    endpoints: vec![EndpointStatus {
                        name: "login".to_string(),
                        status: None,
                        status_text: "connection refused".to_string(),
                        error: Some("connection refused".to_string()),
                    }],
                }
            }
        }
    }
}

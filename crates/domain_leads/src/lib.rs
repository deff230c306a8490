//! Lead Capture Domain
//!
//! This crate manages website form submissions (contact enquiries and
//! consultation requests) and their synchronization into the external CRM.
//!
//! # Sync Model
//!
//! Every submitted record carries a sync state machine:
//!
//! - **Pending**: stored locally, not yet pushed to the CRM
//! - **InProgress**: claimed by a sync attempt (atomic single-row flip)
//! - **Synced**: pushed successfully; terminal, never re-scanned
//! - **Failed**: last attempt failed; retried until the attempt ceiling
//!
//! A record is eligible for (re)sync while it is not `Synced` and its
//! attempt count is below the configured maximum. The claim step makes
//! at-most-one-in-flight-attempt-per-record a hard guarantee even when the
//! request-triggered immediate sync races the scheduled worker.
//!
//! # Components
//!
//! - [`ports::LeadStorePort`]: the durable record store contract
//! - [`ports::CrmPort`]: the CRM client contract
//! - [`adapters::LegacyCrmClient`]: REST adapter for the legacy CRM
//! - [`sync::SyncEngine`]: drains eligible records and updates their state
//! - [`sync::SyncWorker`]: interval-driven background loop
//! - [`service::IntakeService`]: submit + best-effort immediate sync
//!
//! # Examples
//!
//! ```rust,ignore
//! use domain_leads::{IntakeService, NewConsultation, SyncEngine, SyncSettings};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(SyncEngine::new(store.clone(), crm, SyncSettings::default()));
//! let intake = IntakeService::new(store, engine);
//!
//! let consultation = intake
//!     .submit_consultation(NewConsultation {
//!         name: "Test User".to_string(),
//!         email: "test@example.com".to_string(),
//!         phone: "1234567890".to_string(),
//!         notes: None,
//!         preferred_date: None,
//!         preferred_time: None,
//!     })
//!     .await?;
//! ```

pub mod lead;
pub mod sync_task;
pub mod error;
pub mod validation;
pub mod ports;
pub mod adapters;
pub mod sync;
pub mod service;

pub use lead::{
    Contact, Consultation, NewContact, NewConsultation,
    PendingRecord, SyncEntityType, SyncRecordRef, SyncState, SyncStatus,
};
pub use sync_task::{SyncDirection, SyncTask};
pub use error::LeadsError;
pub use validation::{SubmissionValidator, ValidationResult};
pub use ports::{
    ConnectionReport, CrmConsultationData, CrmContactData, CrmPort,
    EndpointStatus, LeadStorePort, SyncOutcome,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockLeadStore, ScriptedCrm, ScriptedResponse};
pub use adapters::{CrmCapabilities, LegacyCrmClient, LegacyCrmConfig};
pub use sync::{
    SyncAttemptOutcome, SyncEngine, SyncRunReport, SyncSettings, SyncWorker, SyncWorkerHandle,
};
pub use service::IntakeService;

//! Sync engine
//!
//! Drives records through the sync state machine. One invocation of
//! [`SyncEngine::process_pending_syncs`] is a **batch**: a bounded set of
//! eligible records, processed sequentially to keep the load on the CRM
//! bounded.
//!
//! Failure isolation: a record's CRM failure is recorded on that record and
//! the batch continues; a store failure aborts the batch (per-record state
//! already written stays written, and the next scheduled run picks up where
//! things stand).

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use core_kernel::PortError;

use crate::lead::{PendingRecord, SyncRecordRef, SyncStatus};
use crate::ports::{CrmPort, LeadStorePort, SyncOutcome};

/// Tuning knobs for the sync engine
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    /// Maximum records processed per batch
    pub batch_size: u32,
    /// Attempt ceiling; records at or above it are terminal
    pub max_attempts: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 5,
        }
    }
}

/// Summary of one engine batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncRunReport {
    /// Records returned by the eligibility scan
    pub scanned: usize,
    /// Records pushed successfully this batch
    pub synced: usize,
    /// Records whose attempt failed this batch
    pub failed: usize,
    /// Records skipped because another path claimed them first
    pub skipped: usize,
}

/// Outcome of a single record's sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttemptOutcome {
    /// Pushed to the CRM; carries the remote id
    Synced { remote_id: String },
    /// Attempt failed; message recorded on the record
    Failed { message: String },
    /// Claim lost to a concurrent sync path; nothing was done
    Skipped,
}

/// Drains pending records from the store and pushes them to the CRM
pub struct SyncEngine {
    store: Arc<dyn LeadStorePort>,
    crm: Arc<dyn CrmPort>,
    settings: SyncSettings,
}

impl SyncEngine {
    /// Creates an engine over the given ports
    pub fn new(store: Arc<dyn LeadStorePort>, crm: Arc<dyn CrmPort>, settings: SyncSettings) -> Self {
        Self {
            store,
            crm,
            settings,
        }
    }

    /// The engine's tuning knobs
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Processes one batch of eligible records
    ///
    /// Records are handled sequentially in the store's returned order
    /// (oldest-attempted first). A record failure never aborts the batch.
    ///
    /// # Errors
    ///
    /// Propagates store failures (scan or status writes); the batch is
    /// abandoned at that point and per-record state already written remains.
    pub async fn process_pending_syncs(&self) -> Result<SyncRunReport, PortError> {
        let batch = self
            .store
            .list_pending(self.settings.batch_size, self.settings.max_attempts)
            .await?;

        let mut report = SyncRunReport {
            scanned: batch.len(),
            ..SyncRunReport::default()
        };

        if batch.is_empty() {
            debug!("No records eligible for sync");
            return Ok(report);
        }

        for record in &batch {
            match self.sync_record(record).await? {
                SyncAttemptOutcome::Synced { remote_id } => {
                    info!(record = %record.sync_ref(), %remote_id, "Record synced to CRM");
                    report.synced += 1;
                }
                SyncAttemptOutcome::Failed { message } => {
                    warn!(record = %record.sync_ref(), %message, "Sync attempt failed");
                    report.failed += 1;
                }
                SyncAttemptOutcome::Skipped => {
                    debug!(record = %record.sync_ref(), "Record claimed elsewhere, skipping");
                    report.skipped += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            "Sync batch complete"
        );
        Ok(report)
    }

    /// Attempts to sync a single record
    ///
    /// Shared by the batch loop and the request-triggered immediate path.
    /// The claim step serializes the two: whichever caller flips the record
    /// to in-progress first performs the attempt, the other skips.
    ///
    /// # Errors
    ///
    /// Propagates store failures only; CRM failures are folded into
    /// `SyncAttemptOutcome::Failed`.
    pub async fn sync_record(
        &self,
        record: &PendingRecord,
    ) -> Result<SyncAttemptOutcome, PortError> {
        let reference = record.sync_ref();

        if !self.store.claim(&reference, self.settings.max_attempts).await? {
            return Ok(SyncAttemptOutcome::Skipped);
        }

        let result = match record {
            PendingRecord::Contact(contact) => {
                self.crm.create_contact(&contact.into()).await
            }
            PendingRecord::Consultation(consultation) => {
                self.crm
                    .create_consultation_meeting(&consultation.into())
                    .await
            }
        };

        // The attempt about to be recorded; mark_* increments to this value.
        let attempts = record.sync().attempts + 1;

        match result {
            Ok(SyncOutcome::Created { remote_id }) => {
                self.store.mark_synced(&reference).await?;
                self.store
                    .record_sync_attempt(&reference, SyncStatus::Synced, attempts, None)
                    .await?;
                Ok(SyncAttemptOutcome::Synced { remote_id })
            }
            Ok(SyncOutcome::Rejected { message }) => {
                self.fail_record(&reference, attempts, message).await
            }
            Err(error) => {
                // No retryable/permanent distinction here: every CRM failure
                // is retried until the attempt ceiling.
                self.fail_record(&reference, attempts, error.to_string())
                    .await
            }
        }
    }

    async fn fail_record(
        &self,
        reference: &SyncRecordRef,
        attempts: u32,
        message: String,
    ) -> Result<SyncAttemptOutcome, PortError> {
        self.store.mark_failed(reference, &message).await?;
        self.store
            .record_sync_attempt(reference, SyncStatus::Failed, attempts, Some(&message))
            .await?;
        Ok(SyncAttemptOutcome::Failed { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::{NewConsultation, NewContact, SyncStatus};
    use crate::ports::mock::{MockLeadStore, ScriptedCrm, ScriptedResponse};
    use chrono::{NaiveDate, NaiveTime};

    fn contact_payload() -> NewContact {
        NewContact {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
        }
    }

    fn engine_with(
        store: Arc<MockLeadStore>,
        crm: Arc<ScriptedCrm>,
        max_attempts: u32,
    ) -> SyncEngine {
        SyncEngine::new(
            store,
            crm,
            SyncSettings {
                batch_size: 10,
                max_attempts,
            },
        )
    }

    #[tokio::test]
    async fn empty_pending_set_makes_no_crm_calls() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_succeeds());
        let engine = engine_with(store, crm.clone(), 5);

        let report = engine.process_pending_syncs().await.unwrap();

        assert_eq!(report, SyncRunReport::default());
        assert_eq!(crm.call_count(), 0);
    }

    #[tokio::test]
    async fn submitted_consultation_syncs_on_first_batch() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_succeeds());
        let engine = engine_with(store.clone(), crm.clone(), 5);

        let consultation = store
            .create_consultation(NewConsultation {
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                phone: "1234567890".to_string(),
                notes: None,
                preferred_date: NaiveDate::from_ymd_opt(2025, 2, 27),
                preferred_time: NaiveTime::from_hms_opt(15, 30, 0),
            })
            .await
            .unwrap();
        assert_eq!(consultation.sync.status, SyncStatus::Pending);
        assert_eq!(consultation.sync.attempts, 0);

        let report = engine.process_pending_syncs().await.unwrap();
        assert_eq!(report.synced, 1);

        let synced = store.get_consultation(consultation.id).await.unwrap();
        assert_eq!(synced.sync.status, SyncStatus::Synced);
        assert_eq!(synced.sync.attempts, 1);
        assert!(synced.sync.last_error.is_none());
        assert_eq!(crm.call_count(), 1);
    }

    #[tokio::test]
    async fn record_reaches_synced_on_third_batch_after_two_failures() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::with_script(
            vec![
                ScriptedResponse::TransportError("connection reset".to_string()),
                ScriptedResponse::Rejected("email1 is invalid".to_string()),
            ],
            ScriptedResponse::Created,
        ));
        let engine = engine_with(store.clone(), crm.clone(), 5);

        let contact = store.create_contact(contact_payload()).await.unwrap();

        let first = engine.process_pending_syncs().await.unwrap();
        assert_eq!(first.failed, 1);
        let after_first = store.get_contact(contact.id).await.unwrap();
        assert_eq!(after_first.sync.status, SyncStatus::Failed);
        assert_eq!(after_first.sync.attempts, 1);
        assert!(after_first.sync.last_error.is_some());

        let second = engine.process_pending_syncs().await.unwrap();
        assert_eq!(second.failed, 1);

        let third = engine.process_pending_syncs().await.unwrap();
        assert_eq!(third.synced, 1);

        let after_third = store.get_contact(contact.id).await.unwrap();
        assert_eq!(after_third.sync.status, SyncStatus::Synced);
        assert_eq!(after_third.sync.attempts, 3);
        assert!(after_third.sync.last_error.is_none());
        assert_eq!(crm.call_count(), 3);
    }

    #[tokio::test]
    async fn record_is_terminal_after_attempt_ceiling() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_fails("CRM keeps rejecting this"));
        let max_attempts = 3;
        let engine = engine_with(store.clone(), crm.clone(), max_attempts);

        let contact = store.create_contact(contact_payload()).await.unwrap();

        for _ in 0..max_attempts {
            let report = engine.process_pending_syncs().await.unwrap();
            assert_eq!(report.failed, 1);
        }

        // Ceiling reached: the record is excluded from every future scan.
        let after = engine.process_pending_syncs().await.unwrap();
        assert_eq!(after.scanned, 0);
        assert_eq!(crm.call_count(), max_attempts as usize);

        let terminal = store.get_contact(contact.id).await.unwrap();
        assert_eq!(terminal.sync.status, SyncStatus::Failed);
        assert_eq!(terminal.sync.attempts, max_attempts);
        assert_eq!(
            terminal.sync.last_error.as_deref(),
            Some("CRM keeps rejecting this")
        );
    }

    #[tokio::test]
    async fn one_record_failure_does_not_abort_the_batch() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::with_script(
            vec![ScriptedResponse::Rejected("first record refused".to_string())],
            ScriptedResponse::Created,
        ));
        let engine = engine_with(store.clone(), crm.clone(), 5);

        store.create_contact(contact_payload()).await.unwrap();
        store.create_contact(contact_payload()).await.unwrap();

        let report = engine.process_pending_syncs().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.synced, 1);
        assert_eq!(crm.call_count(), 2);
    }

    #[tokio::test]
    async fn audit_trail_mirrors_attempts() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::with_script(
            vec![ScriptedResponse::Rejected("nope".to_string())],
            ScriptedResponse::Created,
        ));
        let engine = engine_with(store.clone(), crm.clone(), 5);

        let contact = store.create_contact(contact_payload()).await.unwrap();
        let reference = contact.sync_ref();

        engine.process_pending_syncs().await.unwrap();
        let task = store.sync_task(&reference).await.unwrap();
        assert_eq!(task.attempts, 1);
        assert_eq!(task.status, SyncStatus::Failed);
        assert_eq!(task.last_error.as_deref(), Some("nope"));

        engine.process_pending_syncs().await.unwrap();
        let task = store.sync_task(&reference).await.unwrap();
        assert_eq!(task.attempts, 2);
        assert_eq!(task.status, SyncStatus::Synced);
        assert!(task.last_error.is_none());
    }

    #[tokio::test]
    async fn immediate_path_skips_when_claim_is_lost() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_succeeds());
        let engine = engine_with(store.clone(), crm.clone(), 5);

        let contact = store.create_contact(contact_payload()).await.unwrap();
        let record = PendingRecord::Contact(contact.clone());

        // Simulate the scheduled worker winning the claim first.
        assert!(store.claim(&contact.sync_ref(), 5).await.unwrap());

        let outcome = engine.sync_record(&record).await.unwrap();
        assert_eq!(outcome, SyncAttemptOutcome::Skipped);
        assert_eq!(crm.call_count(), 0);
    }
}

//! Intake service
//!
//! The entry point the HTTP layer calls for form submissions. A submission
//! is durably stored first, then pushed to the CRM best-effort: if that
//! immediate attempt fails for any reason, the failure is downgraded to a
//! warning and the record stays queued for the scheduled worker. The
//! visitor-facing submission therefore succeeds whenever the local store
//! accepts the record, regardless of CRM availability.

use std::sync::Arc;

use tracing::warn;

use core_kernel::PortError;

use crate::lead::{Consultation, Contact, NewConsultation, NewContact, PendingRecord};
use crate::ports::LeadStorePort;
use crate::sync::SyncEngine;

/// Accepts submissions and performs the best-effort immediate sync
pub struct IntakeService {
    store: Arc<dyn LeadStorePort>,
    engine: Arc<SyncEngine>,
}

impl IntakeService {
    /// Creates the service over the given store and engine
    pub fn new(store: Arc<dyn LeadStorePort>, engine: Arc<SyncEngine>) -> Self {
        Self { store, engine }
    }

    /// Stores a contact enquiry and attempts one immediate sync
    ///
    /// # Errors
    ///
    /// `PortError::Validation` for incomplete payloads, `PortError` store
    /// failures otherwise. CRM failures never surface here.
    pub async fn submit_contact(&self, payload: NewContact) -> Result<Contact, PortError> {
        let contact = self.store.create_contact(payload).await?;

        self.try_immediate_sync(PendingRecord::Contact(contact.clone()))
            .await;

        // Re-read so the caller sees the post-attempt sync state.
        match self.store.get_contact(contact.id).await {
            Ok(fresh) => Ok(fresh),
            Err(error) => {
                warn!(%error, "Could not re-read contact after immediate sync");
                Ok(contact)
            }
        }
    }

    /// Stores a consultation request and attempts one immediate sync
    pub async fn submit_consultation(
        &self,
        payload: NewConsultation,
    ) -> Result<Consultation, PortError> {
        let consultation = self.store.create_consultation(payload).await?;

        self.try_immediate_sync(PendingRecord::Consultation(consultation.clone()))
            .await;

        match self.store.get_consultation(consultation.id).await {
            Ok(fresh) => Ok(fresh),
            Err(error) => {
                warn!(%error, "Could not re-read consultation after immediate sync");
                Ok(consultation)
            }
        }
    }

    /// One best-effort sync attempt; every failure is non-fatal here
    async fn try_immediate_sync(&self, record: PendingRecord) {
        if let Err(error) = self.engine.sync_record(&record).await {
            warn!(
                record = %record.sync_ref(),
                %error,
                "Immediate sync attempt failed; record stays queued"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::SyncStatus;
    use crate::ports::mock::{MockLeadStore, ScriptedCrm};
    use crate::sync::SyncSettings;

    fn service_with(crm: Arc<ScriptedCrm>) -> (IntakeService, Arc<MockLeadStore>) {
        let store = Arc::new(MockLeadStore::new());
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            crm,
            SyncSettings::default(),
        ));
        (IntakeService::new(store.clone(), engine), store)
    }

    fn contact_payload() -> NewContact {
        NewContact {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: Some("Interested in a two-storey playhouse".to_string()),
        }
    }

    #[tokio::test]
    async fn submission_with_healthy_crm_returns_synced() {
        let (service, _store) = service_with(Arc::new(ScriptedCrm::always_succeeds()));

        let contact = service.submit_contact(contact_payload()).await.unwrap();

        assert_eq!(contact.sync.status, SyncStatus::Synced);
        assert_eq!(contact.sync.attempts, 1);
    }

    #[tokio::test]
    async fn submission_succeeds_even_when_crm_is_down() {
        let (service, _store) =
            service_with(Arc::new(ScriptedCrm::always_fails("CRM offline")));

        let contact = service.submit_contact(contact_payload()).await.unwrap();

        // The submission itself succeeded; the record is queued for retry.
        assert_eq!(contact.sync.status, SyncStatus::Failed);
        assert_eq!(contact.sync.attempts, 1);
        assert_eq!(contact.sync.last_error.as_deref(), Some("CRM offline"));
    }

    #[tokio::test]
    async fn invalid_submission_is_rejected_before_any_sync() {
        let crm = Arc::new(ScriptedCrm::always_succeeds());
        let (service, _store) = service_with(crm.clone());

        let result = service
            .submit_contact(NewContact {
                name: String::new(),
                email: String::new(),
                phone: String::new(),
                notes: None,
            })
            .await;

        assert!(matches!(result, Err(PortError::Validation { .. })));
        assert_eq!(crm.call_count(), 0);
    }
}

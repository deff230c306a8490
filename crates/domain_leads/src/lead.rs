//! Lead entities and their sync state machine
//!
//! Two entity kinds flow through the system: `Contact` (a general enquiry)
//! and `Consultation` (a design-consultation request, optionally with a
//! preferred date and time). Both carry an embedded [`SyncState`] that the
//! sync engine advances; the engine is the only writer of that state.
//!
//! Payload fields arrive from the website's form layer. They are validated
//! there but treated as untrusted strings here.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{ConsultationId, ContactId};

use crate::error::LeadsError;

/// Synchronization status of a record
///
/// State machine: `Pending -> InProgress -> {Synced, Failed}`;
/// `Failed -> InProgress` (retry) until the attempt ceiling. `Synced` is
/// terminal: a record enters it at most once and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Stored locally, awaiting its first sync attempt
    Pending,
    /// Claimed by an in-flight sync attempt
    InProgress,
    /// Successfully pushed to the CRM (terminal)
    Synced,
    /// Last attempt failed; eligible for retry until the ceiling
    Failed,
}

impl SyncStatus {
    /// Returns the canonical database/string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    /// Returns true for the terminal success state
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = LeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "in_progress" => Ok(SyncStatus::InProgress),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(LeadsError::invalid(format!(
                "unknown sync status '{other}'"
            ))),
        }
    }
}

/// Sync bookkeeping embedded in every syncable record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Current position in the sync state machine
    pub status: SyncStatus,
    /// Total attempts made, successful or not. Only ever increases.
    pub attempts: u32,
    /// Timestamp of the most recent attempt
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Message from the last failed attempt; cleared only on success
    pub last_error: Option<String>,
}

impl SyncState {
    /// Initial state for a freshly stored record
    pub fn new() -> Self {
        Self {
            status: SyncStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    /// Whether this record should be picked up by a sync scan
    ///
    /// Eligible iff not yet synced and under the attempt ceiling. An
    /// `InProgress` record is not eligible here; stale-claim recovery is the
    /// store's concern (it knows the claim timestamps).
    pub fn is_eligible(&self, max_attempts: u32) -> bool {
        matches!(self.status, SyncStatus::Pending | SyncStatus::Failed)
            && self.attempts < max_attempts
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated payload for a new contact enquiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Validated payload for a new consultation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConsultation {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    /// Preferred consultation date, if the visitor picked one
    pub preferred_date: Option<NaiveDate>,
    /// Preferred consultation time, if the visitor picked one
    pub preferred_time: Option<NaiveTime>,
}

/// A stored contact enquiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub sync: SyncState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a new contact in the initial (pending) sync state
    pub fn new(payload: NewContact) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::new(),
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            notes: payload.notes,
            sync: SyncState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference used by the sync engine and audit trail
    pub fn sync_ref(&self) -> SyncRecordRef {
        SyncRecordRef {
            entity_type: SyncEntityType::Contact,
            id: *self.id.as_uuid(),
        }
    }
}

/// A stored consultation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub sync: SyncState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    /// Creates a new consultation in the initial (pending) sync state
    pub fn new(payload: NewConsultation) -> Self {
        let now = Utc::now();
        Self {
            id: ConsultationId::new(),
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            notes: payload.notes,
            preferred_date: payload.preferred_date,
            preferred_time: payload.preferred_time,
            sync: SyncState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference used by the sync engine and audit trail
    pub fn sync_ref(&self) -> SyncRecordRef {
        SyncRecordRef {
            entity_type: SyncEntityType::Consultation,
            id: *self.id.as_uuid(),
        }
    }
}

/// The entity kinds handled by the sync subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityType {
    Contact,
    Consultation,
}

impl SyncEntityType {
    /// Returns the canonical database/string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEntityType::Contact => "contact",
            SyncEntityType::Consultation => "consultation",
        }
    }
}

impl fmt::Display for SyncEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncEntityType {
    type Err = LeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact" => Ok(SyncEntityType::Contact),
            "consultation" => Ok(SyncEntityType::Consultation),
            other => Err(LeadsError::invalid(format!(
                "unknown sync entity type '{other}'"
            ))),
        }
    }
}

/// Type-erased reference to a syncable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRecordRef {
    pub entity_type: SyncEntityType,
    pub id: Uuid,
}

impl fmt::Display for SyncRecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}

/// One eligible record returned by a pending-records scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRecord {
    Contact(Contact),
    Consultation(Consultation),
}

impl PendingRecord {
    /// Reference used by the sync engine and audit trail
    pub fn sync_ref(&self) -> SyncRecordRef {
        match self {
            PendingRecord::Contact(contact) => contact.sync_ref(),
            PendingRecord::Consultation(consultation) => consultation.sync_ref(),
        }
    }

    /// The record's sync bookkeeping
    pub fn sync(&self) -> &SyncState {
        match self {
            PendingRecord::Contact(contact) => &contact.sync,
            PendingRecord::Consultation(consultation) => &consultation.sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consultation_payload() -> NewConsultation {
        NewConsultation {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
            preferred_date: NaiveDate::from_ymd_opt(2025, 2, 27),
            preferred_time: NaiveTime::from_hms_opt(15, 30, 0),
        }
    }

    #[test]
    fn new_records_start_pending_with_zero_attempts() {
        let consultation = Consultation::new(consultation_payload());

        assert_eq!(consultation.sync.status, SyncStatus::Pending);
        assert_eq!(consultation.sync.attempts, 0);
        assert!(consultation.sync.last_attempt_at.is_none());
        assert!(consultation.sync.last_error.is_none());
    }

    #[test]
    fn eligibility_honours_status_and_attempt_ceiling() {
        let mut state = SyncState::new();
        assert!(state.is_eligible(5));

        state.status = SyncStatus::Failed;
        state.attempts = 4;
        assert!(state.is_eligible(5));

        state.attempts = 5;
        assert!(!state.is_eligible(5));

        state.status = SyncStatus::Synced;
        state.attempts = 1;
        assert!(!state.is_eligible(5));

        state.status = SyncStatus::InProgress;
        assert!(!state.is_eligible(5));
    }

    #[test]
    fn sync_status_string_roundtrip() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::InProgress,
            SyncStatus::Synced,
            SyncStatus::Failed,
        ] {
            let parsed: SyncStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn sync_ref_carries_entity_type() {
        let contact = Contact::new(NewContact {
            name: "A".to_string(),
            email: "a@example.com".to_string(),
            phone: "1".to_string(),
            notes: None,
        });
        let reference = contact.sync_ref();

        assert_eq!(reference.entity_type, SyncEntityType::Contact);
        assert_eq!(reference.id, *contact.id.as_uuid());
    }
}

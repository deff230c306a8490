//! Sync audit trail
//!
//! A `SyncTask` row is created the first time a record is pushed toward the
//! CRM and updated in place on every subsequent attempt for the same
//! (direction, entity type, entity id) triple. The table is append-only in
//! the sense that rows are never deleted; it is the operational history of
//! the sync subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::SyncTaskId;

use crate::error::LeadsError;
use crate::lead::{SyncEntityType, SyncStatus};

/// Direction of a sync flow
///
/// Only one direction exists today; the discriminant is stored anyway so the
/// audit table stays unambiguous if a pull path is ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    LocalToCrm,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::LocalToCrm => "local_to_crm",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = LeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_to_crm" => Ok(SyncDirection::LocalToCrm),
            other => Err(LeadsError::invalid(format!(
                "unknown sync direction '{other}'"
            ))),
        }
    }
}

/// One audit row per synced entity and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    pub id: SyncTaskId,
    pub direction: SyncDirection,
    pub entity_type: SyncEntityType,
    pub entity_id: Uuid,
    pub status: SyncStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncTask {
    /// Creates the audit row for a record's first sync attempt
    pub fn first_attempt(
        entity_type: SyncEntityType,
        entity_id: Uuid,
        status: SyncStatus,
        error: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SyncTaskId::new(),
            direction: SyncDirection::LocalToCrm,
            entity_type,
            entity_id,
            status,
            attempts: 1,
            last_error: error,
            created_at: now,
            updated_at: now,
        }
    }

    /// Updates the row in place for a subsequent attempt
    pub fn record_attempt(&mut self, status: SyncStatus, attempts: u32, error: Option<String>) {
        self.status = status;
        self.attempts = attempts;
        self.last_error = error;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_starts_at_one() {
        let task = SyncTask::first_attempt(
            SyncEntityType::Consultation,
            Uuid::new_v4(),
            SyncStatus::Failed,
            Some("connection refused".to_string()),
        );

        assert_eq!(task.attempts, 1);
        assert_eq!(task.direction, SyncDirection::LocalToCrm);
        assert_eq!(task.status, SyncStatus::Failed);
    }

    #[test]
    fn record_attempt_updates_in_place() {
        let mut task = SyncTask::first_attempt(
            SyncEntityType::Contact,
            Uuid::new_v4(),
            SyncStatus::Failed,
            Some("timeout".to_string()),
        );
        let id = task.id;

        task.record_attempt(SyncStatus::Synced, 2, None);

        assert_eq!(task.id, id);
        assert_eq!(task.attempts, 2);
        assert_eq!(task.status, SyncStatus::Synced);
        assert!(task.last_error.is_none());
    }

    #[test]
    fn direction_string_roundtrip() {
        let parsed: SyncDirection = SyncDirection::LocalToCrm.as_str().parse().unwrap();
        assert_eq!(parsed, SyncDirection::LocalToCrm);
        assert!("crm_to_local".parse::<SyncDirection>().is_err());
    }
}

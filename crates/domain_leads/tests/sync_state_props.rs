//! Property-based tests for the sync state machine

use domain_leads::{SyncState, SyncStatus};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = SyncStatus> {
    prop_oneof![
        Just(SyncStatus::Pending),
        Just(SyncStatus::InProgress),
        Just(SyncStatus::Synced),
        Just(SyncStatus::Failed),
    ]
}

proptest! {
    /// Eligibility is exactly "retryable status and attempts under the ceiling"
    #[test]
    fn eligibility_requires_retryable_status_and_headroom(
        status in status_strategy(),
        attempts in 0u32..20,
        max_attempts in 1u32..10,
    ) {
        let state = SyncState {
            status,
            attempts,
            last_attempt_at: None,
            last_error: None,
        };

        let expected = matches!(status, SyncStatus::Pending | SyncStatus::Failed)
            && attempts < max_attempts;
        prop_assert_eq!(state.is_eligible(max_attempts), expected);
    }

    /// A synced record is ineligible at every ceiling
    #[test]
    fn synced_is_terminal_for_any_ceiling(attempts in 0u32..20, max_attempts in 1u32..100) {
        let state = SyncState {
            status: SyncStatus::Synced,
            attempts,
            last_attempt_at: None,
            last_error: None,
        };
        prop_assert!(!state.is_eligible(max_attempts));
    }

    /// Status strings survive a parse round trip
    #[test]
    fn status_roundtrips_through_strings(status in status_strategy()) {
        prop_assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
    }
}

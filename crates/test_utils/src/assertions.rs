//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use domain_leads::{SyncState, SyncStatus};

/// Asserts that a record's sync state is the initial pending state
///
/// # Panics
///
/// Panics if the status isn't pending, attempts aren't zero, or any
/// attempt bookkeeping is already set
pub fn assert_sync_initial(sync: &SyncState) {
    assert_eq!(
        sync.status,
        SyncStatus::Pending,
        "Expected freshly stored record to be pending, got {}",
        sync.status
    );
    assert_eq!(
        sync.attempts, 0,
        "Expected zero attempts on a fresh record, got {}",
        sync.attempts
    );
    assert!(
        sync.last_attempt_at.is_none(),
        "Fresh record should have no attempt timestamp"
    );
    assert!(
        sync.last_error.is_none(),
        "Fresh record should have no stored error"
    );
}

/// Asserts that a record reached the terminal synced state
///
/// # Arguments
///
/// * `sync` - The sync state under test
/// * `expected_attempts` - How many attempts it should have taken
pub fn assert_sync_succeeded(sync: &SyncState, expected_attempts: u32) {
    assert_eq!(
        sync.status,
        SyncStatus::Synced,
        "Expected synced, got {} (last error: {:?})",
        sync.status,
        sync.last_error
    );
    assert_eq!(
        sync.attempts, expected_attempts,
        "Expected {} attempts, got {}",
        expected_attempts, sync.attempts
    );
    assert!(
        sync.last_error.is_none(),
        "Synced record must have its error cleared, got {:?}",
        sync.last_error
    );
    assert!(
        sync.last_attempt_at.is_some(),
        "Synced record must carry an attempt timestamp"
    );
}

/// Asserts that a record failed with the given error fragment
pub fn assert_sync_failed_with(sync: &SyncState, error_fragment: &str) {
    assert_eq!(
        sync.status,
        SyncStatus::Failed,
        "Expected failed, got {}",
        sync.status
    );
    let error = sync
        .last_error
        .as_deref()
        .expect("failed record must carry an error message");
    assert!(
        error.contains(error_fragment),
        "Error '{}' does not contain '{}'",
        error,
        error_fragment
    );
}

/// Asserts that attempts only moved forward between two observations
pub fn assert_attempts_monotonic(before: &SyncState, after: &SyncState) {
    assert!(
        after.attempts >= before.attempts,
        "Attempt count went backwards: {} -> {}",
        before.attempts,
        after.attempts
    );
}

//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;

use domain_leads::{NewConsultation, NewContact, SyncStatus};

/// Strategy for generating non-blank names
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,30}[A-Za-z]"
}

/// Strategy for generating plausible email addresses
pub fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,10}@[a-z]{1,10}\\.(com|net|org)"
}

/// Strategy for generating phone numbers
pub fn phone_strategy() -> impl Strategy<Value = String> {
    "[0-9]{7,12}"
}

/// Strategy for generating valid contact payloads
pub fn contact_strategy() -> impl Strategy<Value = NewContact> {
    (
        name_strategy(),
        email_strategy(),
        phone_strategy(),
        proptest::option::of("[A-Za-z ]{1,60}"),
    )
        .prop_map(|(name, email, phone, notes)| NewContact {
            name,
            email,
            phone,
            notes,
        })
}

/// Strategy for generating preferred consultation dates in 2025
pub fn preferred_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..=12, 1u32..=28).prop_map(|(month, day)| {
        NaiveDate::from_ymd_opt(2025, month, day).expect("day <= 28 is always valid")
    })
}

/// Strategy for generating preferred consultation times
pub fn preferred_time_strategy() -> impl Strategy<Value = NaiveTime> {
    (8u32..=17, 0u32..=59).prop_map(|(hour, minute)| {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("within range")
    })
}

/// Strategy for generating valid consultation payloads
pub fn consultation_strategy() -> impl Strategy<Value = NewConsultation> {
    (
        contact_strategy(),
        proptest::option::of(preferred_date_strategy()),
        proptest::option::of(preferred_time_strategy()),
    )
        .prop_map(|(contact, preferred_date, preferred_time)| NewConsultation {
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            notes: contact.notes,
            preferred_date,
            preferred_time,
        })
}

/// Strategy for generating sync statuses
pub fn sync_status_strategy() -> impl Strategy<Value = SyncStatus> {
    prop_oneof![
        Just(SyncStatus::Pending),
        Just(SyncStatus::InProgress),
        Just(SyncStatus::Synced),
        Just(SyncStatus::Failed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_leads::SubmissionValidator;

    proptest! {
        #[test]
        fn generated_contacts_are_valid(contact in contact_strategy()) {
            let result = SubmissionValidator::validate_contact(&contact);
            prop_assert!(result.is_valid, "errors: {:?}", result.errors);
        }

        #[test]
        fn generated_consultations_are_valid(consultation in consultation_strategy()) {
            let result = SubmissionValidator::validate_consultation(&consultation);
            prop_assert!(result.is_valid, "errors: {:?}", result.errors);
        }
    }
}

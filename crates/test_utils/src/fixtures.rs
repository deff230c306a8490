//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the lead-capture entities.
//! These fixtures are designed to be consistent and predictable for unit
//! tests; randomized variants (via `fake`) exist for volume scenarios.

use chrono::{NaiveDate, NaiveTime};
use core_kernel::{ConsultationId, ContactId};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;

use domain_leads::{NewConsultation, NewContact};

/// Fixture for submission payloads
pub struct SubmissionFixtures;

impl SubmissionFixtures {
    /// The canonical valid contact enquiry
    pub fn contact() -> NewContact {
        NewContact {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: Some("Interested in a custom treehouse".to_string()),
        }
    }

    /// The canonical valid consultation request with a preferred slot
    pub fn consultation() -> NewConsultation {
        NewConsultation {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
            preferred_date: NaiveDate::from_ymd_opt(2025, 2, 27),
            preferred_time: NaiveTime::from_hms_opt(15, 30, 0),
        }
    }

    /// A consultation without a preferred slot (no CRM meeting expected)
    pub fn consultation_without_slot() -> NewConsultation {
        NewConsultation {
            preferred_date: None,
            preferred_time: None,
            ..Self::consultation()
        }
    }

    /// A contact missing every required field
    pub fn invalid_contact() -> NewContact {
        NewContact {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            notes: None,
        }
    }

    /// A randomized but valid contact enquiry
    pub fn random_contact() -> NewContact {
        NewContact {
            name: Name().fake(),
            email: SafeEmail().fake(),
            phone: PhoneNumber().fake(),
            notes: None,
        }
    }

    /// A randomized but valid consultation request
    pub fn random_consultation() -> NewConsultation {
        NewConsultation {
            name: Name().fake(),
            email: SafeEmail().fake(),
            phone: PhoneNumber().fake(),
            notes: None,
            preferred_date: NaiveDate::from_ymd_opt(2025, (1..=12).fake(), (1..=28).fake()),
            preferred_time: NaiveTime::from_hms_opt((8..=17).fake(), (0..=59).fake(), 0),
        }
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a fresh contact id
    pub fn contact_id() -> ContactId {
        ContactId::new()
    }

    /// Creates a fresh consultation id
    pub fn consultation_id() -> ConsultationId {
        ConsultationId::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_leads::SubmissionValidator;

    #[test]
    fn canonical_fixtures_pass_validation() {
        assert!(SubmissionValidator::validate_contact(&SubmissionFixtures::contact()).is_valid);
        assert!(
            SubmissionValidator::validate_consultation(&SubmissionFixtures::consultation())
                .is_valid
        );
    }

    #[test]
    fn random_fixtures_pass_validation() {
        for _ in 0..20 {
            let contact = SubmissionFixtures::random_contact();
            assert!(
                SubmissionValidator::validate_contact(&contact).is_valid,
                "random contact failed validation: {contact:?}"
            );
        }
    }

    #[test]
    fn invalid_fixture_fails_validation() {
        assert!(
            !SubmissionValidator::validate_contact(&SubmissionFixtures::invalid_contact())
                .is_valid
        );
    }
}

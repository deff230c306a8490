//! Submission validation rules
//!
//! This module validates submissions at the record-store boundary, ensuring
//! the fields the CRM needs are present before a record is accepted into the
//! sync queue.
//!
//! # Validation Rules
//!
//! ## All submissions
//! - Must have a non-blank name, email, and phone
//! - Email must look like an address (contains `@` and a domain dot)
//!
//! ## Consultations
//! - A preferred time without a preferred date is flagged as a warning
//!   (the CRM meeting can only be scheduled with both)
//! - A preferred date in the past is flagged as a warning

use chrono::Utc;

use crate::lead::{NewConsultation, NewContact};

/// Result of submission validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the submission is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Adds a warning to the result
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Validator for inbound submissions
///
/// # Examples
///
/// ```rust
/// use domain_leads::{NewContact, SubmissionValidator};
///
/// let result = SubmissionValidator::validate_contact(&NewContact {
///     name: "Test User".to_string(),
///     email: "test@example.com".to_string(),
///     phone: "1234567890".to_string(),
///     notes: None,
/// });
/// assert!(result.is_valid);
/// ```
pub struct SubmissionValidator;

impl SubmissionValidator {
    /// Validates a contact enquiry payload
    pub fn validate_contact(payload: &NewContact) -> ValidationResult {
        let mut result = ValidationResult::ok();
        Self::validate_common(&payload.name, &payload.email, &payload.phone, &mut result);
        result
    }

    /// Validates a consultation request payload
    pub fn validate_consultation(payload: &NewConsultation) -> ValidationResult {
        let mut result = ValidationResult::ok();
        Self::validate_common(&payload.name, &payload.email, &payload.phone, &mut result);

        if payload.preferred_time.is_some() && payload.preferred_date.is_none() {
            result.add_warning("Preferred time given without a preferred date");
        }

        if let Some(date) = payload.preferred_date {
            if date < Utc::now().date_naive() {
                result.add_warning(format!("Preferred date {date} is in the past"));
            }
        }

        result
    }

    /// Validates the fields every submission must carry
    fn validate_common(name: &str, email: &str, phone: &str, result: &mut ValidationResult) {
        if name.trim().is_empty() {
            result.add_error("Name is required");
        }

        if email.trim().is_empty() {
            result.add_error("Email is required");
        } else if !email.contains('@') || !email.contains('.') {
            result.add_error(format!("Email '{email}' is not a valid address"));
        }

        if phone.trim().is_empty() {
            result.add_error("Phone is required");
        } else if phone.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
            result.add_warning(format!("Phone '{phone}' looks too short"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn valid_contact() -> NewContact {
        NewContact {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
        }
    }

    #[test]
    fn accepts_valid_contact() {
        let result = SubmissionValidator::validate_contact(&valid_contact());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let payload = NewContact {
            name: "  ".to_string(),
            email: String::new(),
            phone: String::new(),
            notes: None,
        };
        let result = SubmissionValidator::validate_contact(&payload);

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn rejects_malformed_email() {
        let mut payload = valid_contact();
        payload.email = "not-an-email".to_string();
        let result = SubmissionValidator::validate_contact(&payload);

        assert!(!result.is_valid);
        assert!(result.errors[0].contains("not a valid address"));
    }

    #[test]
    fn warns_on_short_phone() {
        let mut payload = valid_contact();
        payload.phone = "12345".to_string();
        let result = SubmissionValidator::validate_contact(&payload);

        // Short phone is a warning, not an error
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn warns_on_time_without_date() {
        let payload = NewConsultation {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
            preferred_date: None,
            preferred_time: NaiveTime::from_hms_opt(15, 30, 0),
        };
        let result = SubmissionValidator::validate_consultation(&payload);

        assert!(result.is_valid);
        assert!(result.warnings[0].contains("without a preferred date"));
    }

    #[test]
    fn warns_on_past_date() {
        let payload = NewConsultation {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
            preferred_date: Some((Utc::now() - Duration::days(30)).date_naive()),
            preferred_time: None,
        };
        let result = SubmissionValidator::validate_consultation(&payload);

        assert!(result.is_valid);
        assert!(result.warnings[0].contains("in the past"));
    }
}

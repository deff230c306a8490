//! Lead domain errors
//!
//! This module defines all error types that can occur in the lead-capture
//! domain, including validation failures and malformed stored data.

use thiserror::Error;

/// Errors that can occur in the lead-capture domain
#[derive(Debug, Error)]
pub enum LeadsError {
    /// Contact with the given ID was not found
    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// Consultation with the given ID was not found
    #[error("Consultation not found: {0}")]
    ConsultationNotFound(String),

    /// Invalid submission data provided
    #[error("Invalid submission data: {0}")]
    InvalidData(String),

    /// Submission validation failed
    #[error("Submission validation failed: {0}")]
    ValidationFailed(String),

    /// A stored sync status or entity tag could not be interpreted
    #[error("Invalid sync state transition: {0}")]
    InvalidStateTransition(String),
}

impl LeadsError {
    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        LeadsError::InvalidData(message.into())
    }

    /// Creates a ValidationFailed error from validation errors
    pub fn validation_failed(errors: Vec<String>) -> Self {
        LeadsError::ValidationFailed(errors.join("; "))
    }

    /// Creates a ContactNotFound error from any ID type
    pub fn contact_not_found(id: impl std::fmt::Display) -> Self {
        LeadsError::ContactNotFound(id.to_string())
    }

    /// Creates a ConsultationNotFound error from any ID type
    pub fn consultation_not_found(id: impl std::fmt::Display) -> Self {
        LeadsError::ConsultationNotFound(id.to_string())
    }
}

//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{NaiveDate, NaiveTime};

use domain_leads::{NewConsultation, NewContact};

/// Builder for constructing test contact payloads
pub struct TestContactBuilder {
    name: String,
    email: String,
    phone: String,
    notes: Option<String>,
}

impl Default for TestContactBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContactBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
        }
    }

    /// Sets the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Sets the free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds the contact payload
    pub fn build(self) -> NewContact {
        NewContact {
            name: self.name,
            email: self.email,
            phone: self.phone,
            notes: self.notes,
        }
    }
}

/// Builder for constructing test consultation payloads
pub struct TestConsultationBuilder {
    name: String,
    email: String,
    phone: String,
    notes: Option<String>,
    preferred_date: Option<NaiveDate>,
    preferred_time: Option<NaiveTime>,
}

impl Default for TestConsultationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConsultationBuilder {
    /// Creates a new builder with default values (no preferred slot)
    pub fn new() -> Self {
        Self {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
            preferred_date: None,
            preferred_time: None,
        }
    }

    /// Sets the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Sets the free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the preferred consultation slot
    pub fn with_slot(mut self, date: NaiveDate, time: NaiveTime) -> Self {
        self.preferred_date = Some(date);
        self.preferred_time = Some(time);
        self
    }

    /// Builds the consultation payload
    pub fn build(self) -> NewConsultation {
        NewConsultation {
            name: self.name,
            email: self.email,
            phone: self.phone,
            notes: self.notes,
            preferred_date: self.preferred_date,
            preferred_time: self.preferred_time,
        }
    }
}

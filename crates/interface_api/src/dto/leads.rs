//! Lead submission DTOs
//!
//! The form layer historically sent both snake_case and camelCase field
//! names; both shapes are accepted here via serde aliases and canonicalized
//! into the domain's single payload shape before anything downstream sees
//! them. The CRM client itself only ever receives the canonical form.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_leads::{Consultation, Contact, NewConsultation, NewContact, SyncState};

/// Inbound contact enquiry
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitContactRequest {
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[serde(alias = "phoneNumber")]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default, alias = "message")]
    pub notes: Option<String>,
}

impl SubmitContactRequest {
    /// Canonical domain payload
    pub fn into_new_contact(self) -> NewContact {
        NewContact {
            name: self.name,
            email: self.email,
            phone: self.phone,
            notes: self.notes,
        }
    }
}

/// Inbound consultation request
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitConsultationRequest {
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[serde(alias = "phoneNumber")]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default, alias = "message")]
    pub notes: Option<String>,
    #[serde(default, alias = "preferredDate")]
    pub preferred_date: Option<NaiveDate>,
    #[serde(
        default,
        alias = "preferredTime",
        deserialize_with = "deserialize_preferred_time"
    )]
    pub preferred_time: Option<NaiveTime>,
}

impl SubmitConsultationRequest {
    /// Canonical domain payload
    pub fn into_new_consultation(self) -> NewConsultation {
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

/// Accepts "15:30" as well as "15:30:00"
fn deserialize_preferred_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => NaiveTime::parse_from_str(&value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M"))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Receipt returned to the form layer
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub sync_status: String,
    pub message: String,
}

impl SubmissionResponse {
    fn new(id: Uuid, sync: &SyncState) -> Self {
        let message = if sync.status.is_synced() {
            "Thanks! Your request has been delivered to our team.".to_string()
        } else {
            "Thanks! Your request has been received and will be processed shortly.".to_string()
        };
        Self {
            id,
            sync_status: sync.status.to_string(),
            message,
        }
    }

    pub fn for_contact(contact: &Contact) -> Self {
        Self::new(*contact.id.as_uuid(), &contact.sync)
    }

    pub fn for_consultation(consultation: &Consultation) -> Self {
        Self::new(*consultation.id.as_uuid(), &consultation.sync)
    }
}

/// Sync bookkeeping in admin responses
#[derive(Debug, Serialize)]
pub struct SyncStateResponse {
    pub status: String,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<&SyncState> for SyncStateResponse {
    fn from(sync: &SyncState) -> Self {
        Self {
            status: sync.status.to_string(),
            attempts: sync.attempts,
            last_attempt_at: sync.last_attempt_at,
            last_error: sync.last_error.clone(),
        }
    }
}

/// Admin view of a stored contact
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub sync: SyncStateResponse,
    pub created_at: DateTime<Utc>,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: *contact.id.as_uuid(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            notes: contact.notes.clone(),
            sync: (&contact.sync).into(),
            created_at: contact.created_at,
        }
    }
}

/// Admin view of a stored consultation
#[derive(Debug, Serialize)]
pub struct ConsultationResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub sync: SyncStateResponse,
    pub created_at: DateTime<Utc>,
}

impl From<&Consultation> for ConsultationResponse {
    fn from(consultation: &Consultation) -> Self {
        Self {
            id: *consultation.id.as_uuid(),
            name: consultation.name.clone(),
            email: consultation.email.clone(),
            phone: consultation.phone.clone(),
            notes: consultation.notes.clone(),
            preferred_date: consultation.preferred_date,
            preferred_time: consultation.preferred_time,
            sync: (&consultation.sync).into(),
            created_at: consultation.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_aliases_are_accepted() {
        let request: SubmitConsultationRequest = serde_json::from_value(serde_json::json!({
            "fullName": "Test User",
            "email": "test@example.com",
            "phoneNumber": "1234567890",
            "preferredDate": "2025-02-27",
            "preferredTime": "15:30",
        }))
        .unwrap();

        assert_eq!(request.name, "Test User");
        assert_eq!(request.phone, "1234567890");
        assert_eq!(request.preferred_date, NaiveDate::from_ymd_opt(2025, 2, 27));
        assert_eq!(request.preferred_time, NaiveTime::from_hms_opt(15, 30, 0));
    }

    #[test]
    fn seconds_in_preferred_time_are_accepted_too() {
        let request: SubmitConsultationRequest = serde_json::from_value(serde_json::json!({
            "name": "Test User",
            "email": "test@example.com",
            "phone": "1234567890",
            "preferred_time": "09:15:30",
        }))
        .unwrap();

        assert_eq!(request.preferred_time, NaiveTime::from_hms_opt(9, 15, 30));
    }

    #[test]
    fn blank_name_fails_validation() {
        let request: SubmitContactRequest = serde_json::from_value(serde_json::json!({
            "name": "",
            "email": "test@example.com",
            "phone": "1234567890",
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }
}

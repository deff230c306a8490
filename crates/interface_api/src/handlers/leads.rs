//! Lead submission and inspection handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ConsultationId, ContactId};

use crate::dto::leads::{
    ConsultationResponse, ContactResponse, SubmissionResponse, SubmitConsultationRequest,
    SubmitContactRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// Accepts a contact enquiry from the website form
///
/// The record is stored durably first; the CRM push is best-effort, so this
/// returns 201 even when the CRM is down (the sync status says so).
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(request): Json<SubmitContactRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let contact = state.intake.submit_contact(request.into_new_contact()).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::for_contact(&contact)),
    ))
}

/// Accepts a consultation request from the website form
pub async fn submit_consultation(
    State(state): State<AppState>,
    Json(request): Json<SubmitConsultationRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let consultation = state
        .intake
        .submit_consultation(request.into_new_consultation())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::for_consultation(&consultation)),
    ))
}

/// Admin: fetches a contact with its sync state
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactResponse>, ApiError> {
    let contact = state.store.get_contact(ContactId::from_uuid(id)).await?;
    Ok(Json(ContactResponse::from(&contact)))
}

/// Admin: fetches a consultation with its sync state
pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConsultationResponse>, ApiError> {
    let consultation = state
        .store
        .get_consultation(ConsultationId::from_uuid(id))
        .await?;
    Ok(Json(ConsultationResponse::from(&consultation)))
}

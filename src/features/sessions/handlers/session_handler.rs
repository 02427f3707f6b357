use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath};
use crate::features::sessions::dtos::{
    ChatRequestDto, ChatResponseDto, DiagnoseRequestDto, SessionDetailDto, SessionDto,
};
use crate::features::sessions::services::{SessionService, TriageService};
use crate::shared::types::ApiResponse;

/// State for session routes
#[derive(Clone)]
pub struct SessionRoutesState {
    pub sessions: Arc<SessionService>,
    pub triage: Arc<TriageService>,
}

/// Get an active session with its patient and message history
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session found", body = ApiResponse<SessionDetailDto>),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already completed")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<SessionRoutesState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<SessionDetailDto>>> {
    let detail = state.sessions.get_active(id).await?;
    Ok(Json(ApiResponse::success(Some(detail.into()), None, None)))
}

/// Send a patient message and receive the assistant's reply.
///
/// When the assistant refers the patient, the response also carries the
/// issued ticket, the doctor, and the ticket currently being served.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = ChatRequestDto,
    responses(
        (status = 200, description = "Reply generated", body = ApiResponse<ChatResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already completed"),
        (status = 502, description = "Decision service failed")
    ),
    tag = "sessions"
)]
pub async fn send_message(
    State(state): State<SessionRoutesState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<ChatRequestDto>,
) -> Result<Json<ApiResponse<ChatResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let outcome = state.triage.handle_message(id, &dto.message).await?;
    Ok(Json(ApiResponse::success(Some(outcome.into()), None, None)))
}

/// Record the doctor's diagnosis; this completes the session
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/diagnose",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = DiagnoseRequestDto,
    responses(
        (status = 200, description = "Diagnosis recorded", body = ApiResponse<SessionDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn diagnose_session(
    State(state): State<SessionRoutesState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<DiagnoseRequestDto>,
) -> Result<Json<ApiResponse<SessionDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session = state
        .sessions
        .record_doctor_diagnosis(id, &dto.diagnosis)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(session.into()),
        Some("Diagnosis recorded".to_string()),
        None,
    )))
}

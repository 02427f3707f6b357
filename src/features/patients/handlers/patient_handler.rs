use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::patients::dtos::{PatientResponseDto, RegisterPatientDto, VerifyOtpDto};
use crate::features::patients::services::PatientService;
use crate::features::sessions::dtos::SessionDto;
use crate::shared::types::ApiResponse;

/// Register a patient (or refresh a returning one) and email a one-time code
#[utoipa::path(
    post,
    path = "/api/patients/register",
    request_body = RegisterPatientDto,
    responses(
        (status = 201, description = "Patient registered, code sent", body = ApiResponse<PatientResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "patients"
)]
pub async fn register_patient(
    State(service): State<Arc<PatientService>>,
    AppJson(dto): AppJson<RegisterPatientDto>,
) -> Result<(StatusCode, Json<ApiResponse<PatientResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let patient = service.register(dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(patient.into()),
            Some("Verification code sent".to_string()),
            None,
        )),
    ))
}

/// Verify the emailed code and open a triage session with intake vitals
#[utoipa::path(
    post,
    path = "/api/patients/verify-otp",
    request_body = VerifyOtpDto,
    responses(
        (status = 201, description = "Session opened", body = ApiResponse<SessionDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Code does not match or was already used"),
        (status = 404, description = "Unknown email")
    ),
    tag = "patients"
)]
pub async fn verify_otp(
    State(service): State<Arc<PatientService>>,
    AppJson(dto): AppJson<VerifyOtpDto>,
) -> Result<(StatusCode, Json<ApiResponse<SessionDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session = service.verify_otp(&dto.email, &dto.otp, dto.vitals()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(session.into()), None, None)),
    ))
}

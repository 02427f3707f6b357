use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppPath;
use crate::features::doctors::dtos::{DoctorDetailsDto, DoctorResponseDto};
use crate::features::doctors::services::DoctorService;
use crate::shared::types::{ApiResponse, Meta};

/// List all doctors
#[utoipa::path(
    get,
    path = "/api/doctors",
    responses(
        (status = 200, description = "Doctors ordered by name", body = ApiResponse<Vec<DoctorResponseDto>>)
    ),
    tag = "doctors"
)]
pub async fn list_doctors(
    State(service): State<Arc<DoctorService>>,
) -> Result<Json<ApiResponse<Vec<DoctorResponseDto>>>> {
    let doctors: Vec<DoctorResponseDto> =
        service.list().await?.into_iter().map(Into::into).collect();
    let total = doctors.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(doctors),
        None,
        Some(Meta { total }),
    )))
}

/// Get a doctor with appointment counts and today's queue front
#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    params(
        ("id" = Uuid, Path, description = "Doctor ID")
    ),
    responses(
        (status = 200, description = "Doctor found", body = ApiResponse<DoctorDetailsDto>),
        (status = 404, description = "Doctor not found")
    ),
    tag = "doctors"
)]
pub async fn get_doctor(
    State(service): State<Arc<DoctorService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<DoctorDetailsDto>>> {
    let details = service.details(id).await?;
    Ok(Json(ApiResponse::success(Some(details.into()), None, None)))
}

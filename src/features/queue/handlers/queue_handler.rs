use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppPath;
use crate::features::queue::dtos::QueueStatusDto;
use crate::features::queue::services::TicketSequencer;
use crate::shared::types::ApiResponse;

/// Today's queue for a doctor: the ticket being served and how many were issued
#[utoipa::path(
    get,
    path = "/api/queue/{doctor_id}",
    params(
        ("doctor_id" = Uuid, Path, description = "Doctor ID")
    ),
    responses(
        (status = 200, description = "Queue status", body = ApiResponse<QueueStatusDto>),
        (status = 404, description = "Doctor not found")
    ),
    tag = "queue"
)]
pub async fn get_queue_status(
    State(sequencer): State<Arc<TicketSequencer>>,
    AppPath(doctor_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<QueueStatusDto>>> {
    let status = sequencer.queue_status(doctor_id).await?;
    Ok(Json(ApiResponse::success(Some(status.into()), None, None)))
}

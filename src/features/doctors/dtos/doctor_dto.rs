use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::doctors::models::Doctor;
use crate::features::doctors::services::DoctorDetails;
use crate::features::queue::dtos::TicketDto;

/// Response DTO for doctor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorResponseDto {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub room: String,
}

impl From<Doctor> for DoctorResponseDto {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id,
            name: d.name,
            specialty: d.specialty,
            room: d.room,
        }
    }
}

/// Response DTO for doctor details with queue figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDetailsDto {
    pub doctor: DoctorResponseDto,
    pub appointment_count_all_time: i64,
    pub appointment_count_daily: i64,
    pub current_queue: Option<TicketDto>,
}

impl From<DoctorDetails> for DoctorDetailsDto {
    fn from(d: DoctorDetails) -> Self {
        Self {
            doctor: d.doctor.into(),
            appointment_count_all_time: d.appointment_count_all_time,
            appointment_count_daily: d.appointment_count_daily,
            current_queue: d.current_queue.map(Into::into),
        }
    }
}

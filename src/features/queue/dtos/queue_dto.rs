use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::queue::models::Ticket;
use crate::features::queue::services::QueueStatus;

/// Response DTO for ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketDto {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub session_id: Uuid,
    /// Position in the doctor's queue for the day, starting at 1
    pub number: i32,
    pub day_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Ticket> for TicketDto {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            doctor_id: t.doctor_id,
            session_id: t.session_id,
            number: t.number,
            day_start: t.day_start,
            created_at: t.created_at,
        }
    }
}

/// Response DTO for a doctor's queue today
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusDto {
    pub doctor_id: Uuid,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    /// Ticket being served, `null` when nobody is waiting
    pub current_front: Option<TicketDto>,
    pub issued_today: i64,
}

impl From<QueueStatus> for QueueStatusDto {
    fn from(s: QueueStatus) -> Self {
        Self {
            doctor_id: s.doctor_id,
            day_start: s.day.start,
            day_end: s.day.end,
            current_front: s.current_front.map(Into::into),
            issued_today: s.issued_today,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::doctors::dtos::DoctorResponseDto;
use crate::features::patients::dtos::PatientResponseDto;
use crate::features::queue::dtos::TicketDto;
use crate::features::sessions::models::{
    Message, MessageRole, Session, SessionDetail, SessionState, Vitals,
};
use crate::features::sessions::services::TriageOutcome;
use crate::modules::decision::NextAction;

/// Request DTO for sending a patient message
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestDto {
    /// The patient's message (1-4000 characters)
    #[validate(length(
        min = 1,
        max = 4000,
        message = "Message must be between 1 and 4000 characters"
    ))]
    pub message: String,
}

/// Request DTO for recording the doctor's diagnosis
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseRequestDto {
    #[validate(length(min = 1, max = 10000, message = "Diagnosis must be 1-10000 characters"))]
    pub diagnosis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

/// Response DTO for session (without history)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub vitals: Vitals,
    pub triage_summary: Option<String>,
    pub doctor_diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionDto {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            patient_id: s.patient_id,
            vitals: s.vitals(),
            triage_summary: s.triage_summary,
            doctor_diagnosis: s.doctor_diagnosis,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Response DTO for session with its patient and ordered history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailDto {
    pub session: SessionDto,
    pub state: SessionState,
    pub patient: PatientResponseDto,
    pub messages: Vec<MessageDto>,
}

impl From<SessionDetail> for SessionDetailDto {
    fn from(detail: SessionDetail) -> Self {
        let state = detail.state();
        Self {
            session: detail.session.into(),
            state,
            patient: detail.patient.into(),
            messages: detail.messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response DTO for one chat round
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseDto {
    pub session_id: Uuid,
    pub reply: String,
    pub next_action: NextAction,
    /// Present when the patient was queued
    pub ticket: Option<TicketDto>,
    pub current_front: Option<TicketDto>,
    pub doctor: Option<DoctorResponseDto>,
}

impl From<TriageOutcome> for ChatResponseDto {
    fn from(o: TriageOutcome) -> Self {
        Self {
            session_id: o.session_id,
            reply: o.reply,
            next_action: o.next_action,
            ticket: o.ticket.map(Into::into),
            current_front: o.current_front.map(Into::into),
            doctor: o.doctor.map(Into::into),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Message;
use crate::features::patients::models::Patient;

/// Lifecycle of a triage session.
///
/// `IntakePending -> Active -> Queued -> Diagnosed`. `Active` loops on itself
/// while the conversation continues; `Queued` and `Diagnosed` are terminal for
/// the conversation. Staff may record a diagnosis from `Active` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    IntakePending,
    Active,
    Queued,
    Diagnosed,
}

impl SessionState {
    /// Whether a new patient message may be processed
    pub fn accepts_messages(self) -> bool {
        matches!(self, SessionState::IntakePending | SessionState::Active)
    }
}

/// Intake vital signs captured when the session is opened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    /// Kilograms
    pub weight: f64,
    /// Centimetres
    pub height: f64,
    /// Beats per minute
    pub heart_rate: f64,
    /// Degrees Celsius
    pub body_temperature: f64,
}

/// Database model for session
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub weight: f64,
    pub height: f64,
    pub heart_rate: f64,
    pub body_temperature: f64,
    pub triage_summary: Option<String>,
    pub doctor_diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn vitals(&self) -> Vitals {
        Vitals {
            weight: self.weight,
            height: self.height,
            heart_rate: self.heart_rate,
            body_temperature: self.body_temperature,
        }
    }

    pub fn has_triage_summary(&self) -> bool {
        self.triage_summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    pub fn has_diagnosis(&self) -> bool {
        self.doctor_diagnosis
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Derive the lifecycle state from the stored fields
    pub fn state(&self, message_count: usize) -> SessionState {
        if self.has_diagnosis() {
            SessionState::Diagnosed
        } else if self.has_triage_summary() {
            SessionState::Queued
        } else if message_count == 0 {
            SessionState::IntakePending
        } else {
            SessionState::Active
        }
    }
}

/// A session loaded together with its owner and ordered history
#[derive(Debug, Clone)]
pub struct SessionDetail {
    pub session: Session,
    pub patient: Patient,
    /// Ascending by `created_at`
    pub messages: Vec<Message>,
}

impl SessionDetail {
    pub fn state(&self) -> SessionState {
        self.session.state(self.messages.len())
    }
}

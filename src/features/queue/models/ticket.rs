use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::sessions::models::NewMessage;
use crate::shared::clock::DayWindow;

/// Database model for ticket: one per queued session, numbered per doctor per day
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub session_id: Uuid,
    pub number: i32,
    /// Start of the local day the number belongs to
    pub day_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Request to issue the next number for `(doctor_id, window)`.
///
/// With `triage_summary` set, the same atomic unit closes the session for
/// triage and appends `messages`; the issue fails with `Conflict` if the
/// session was already closed.
#[derive(Debug, Clone)]
pub struct TicketIssue {
    pub doctor_id: Uuid,
    pub session_id: Uuid,
    pub window: DayWindow,
    pub issued_at: DateTime<Utc>,
    pub triage_summary: Option<String>,
    pub messages: Vec<NewMessage>,
}

/// Next number after the highest one already issued for the doctor-day
pub fn next_ticket_number(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max + 1)
}

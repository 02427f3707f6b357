use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::constants::REPLY_TIMESTAMP_STEP_MS;

/// Author of a chat message, matching the `message_role` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "message_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Patient,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::Patient => write!(f, "patient"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Database model for message. Messages are never updated.
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message about to be appended
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Re-stamp `messages` so each one lands strictly after `last` and after the
/// previous one, keeping its own timestamp when that is already later.
pub fn stamp_after(last: Option<DateTime<Utc>>, messages: Vec<NewMessage>) -> Vec<NewMessage> {
    let step = Duration::milliseconds(REPLY_TIMESTAMP_STEP_MS);
    let mut previous = last;

    messages
        .into_iter()
        .map(|mut message| {
            if let Some(previous) = previous {
                message.created_at = message.created_at.max(previous + step);
            }
            previous = Some(message.created_at);
            message
        })
        .collect()
}

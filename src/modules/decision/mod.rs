//! Triage decision collaborator.
//!
//! Given the rendered system context, the conversation so far and the new
//! patient message, a [`TriageDecider`] returns either "keep talking" or
//! "book an appointment with this doctor".

mod gemini;

pub use gemini::GeminiDecider;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::features::sessions::models::MessageRole;
use crate::shared::llm::{parse_with_fallback, LlmResponse};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Request to decision service failed: {0}")]
    Transport(String),

    #[error("Decision service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decision service returned no text")]
    EmptyResponse,

    #[error("Malformed decision: {0}")]
    Malformed(String),

    #[error("Incomplete decision: {0}")]
    Incomplete(String),
}

/// What the orchestrator should do with the session after this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    ContinueChat,
    Appointment,
}

impl NextAction {
    pub fn as_str(self) -> &'static str {
        match self {
            NextAction::ContinueChat => "CONTINUE_CHAT",
            NextAction::Appointment => "APPOINTMENT",
        }
    }
}

/// One earlier turn of the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub system_context: String,
    /// Oldest first
    pub history: Vec<ChatTurn>,
    pub new_message: String,
}

/// A validated decision
#[derive(Debug, Clone, PartialEq)]
pub enum TriageDecision {
    ContinueChat {
        reply: String,
    },
    Appointment {
        reply: String,
        /// Unverified; the orchestrator resolves it against the directory
        doctor_id: String,
        prediagnosis: String,
    },
}

impl TriageDecision {
    pub fn next_action(&self) -> NextAction {
        match self {
            TriageDecision::ContinueChat { .. } => NextAction::ContinueChat,
            TriageDecision::Appointment { .. } => NextAction::Appointment,
        }
    }

    pub fn reply(&self) -> &str {
        match self {
            TriageDecision::ContinueChat { reply } | TriageDecision::Appointment { reply, .. } => {
                reply
            }
        }
    }
}

fn default_true() -> bool {
    true
}

/// Decision exactly as the model emits it, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "TriageDecision")]
pub struct RawTriageDecision {
    #[serde(default)]
    #[schemars(description = "CONTINUE_CHAT to ask another question, APPOINTMENT to refer the patient")]
    pub next_action: String,

    #[serde(default)]
    #[schemars(description = "Message shown to the patient")]
    pub reply: String,

    #[serde(default)]
    #[schemars(description = "Id of the chosen doctor from the directory; required for APPOINTMENT")]
    pub doctor_id: Option<String>,

    #[serde(default)]
    #[schemars(description = "Short preliminary assessment for the doctor; required for APPOINTMENT")]
    pub prediagnosis: Option<String>,

    #[serde(default = "default_true")]
    #[schemars(skip)]
    pub is_llm_success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub llm_error_message: Option<String>,
}

impl LlmResponse for RawTriageDecision {
    fn mark_as_fallback(&mut self, error_message: String) {
        self.is_llm_success = false;
        self.llm_error_message = Some(error_message);
    }

    fn is_success(&self) -> bool {
        self.is_llm_success
    }
}

/// Trimmed, non-empty value of an optional field
fn required(value: Option<String>, field: &str) -> Result<String, DecisionError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DecisionError::Incomplete(format!("{} is required for APPOINTMENT", field)))
}

impl TryFrom<RawTriageDecision> for TriageDecision {
    type Error = DecisionError;

    fn try_from(raw: RawTriageDecision) -> Result<Self, Self::Error> {
        if !raw.is_success() {
            return Err(DecisionError::Malformed(
                raw.llm_error_message
                    .unwrap_or_else(|| "unparseable response".to_string()),
            ));
        }

        let reply = raw.reply.trim().to_string();
        if reply.is_empty() {
            return Err(DecisionError::Incomplete("reply is empty".to_string()));
        }

        match raw.next_action.trim().to_ascii_uppercase().as_str() {
            "CONTINUE_CHAT" => Ok(TriageDecision::ContinueChat { reply }),
            "APPOINTMENT" => Ok(TriageDecision::Appointment {
                reply,
                doctor_id: required(raw.doctor_id, "doctor_id")?,
                prediagnosis: required(raw.prediagnosis, "prediagnosis")?,
            }),
            other => Err(DecisionError::Malformed(format!(
                "unknown next_action '{}'",
                other
            ))),
        }
    }
}

/// Parse and validate the model's text output
pub fn parse_decision(text: &str) -> Result<TriageDecision, DecisionError> {
    parse_with_fallback::<RawTriageDecision>(text).try_into()
}

#[async_trait]
pub trait TriageDecider: Send + Sync {
    async fn decide(&self, request: DecisionRequest) -> Result<TriageDecision, DecisionError>;
}

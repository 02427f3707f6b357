use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{parse_decision, ChatTurn, DecisionError, DecisionRequest, TriageDecider, TriageDecision};
use crate::core::config::DecisionConfig;
use crate::features::sessions::models::MessageRole;
use crate::shared::constants::{LLM_ROLE_MODEL, LLM_ROLE_USER};

const TOP_P: f32 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Triage decider backed by the Gemini `generateContent` endpoint
pub struct GeminiDecider {
    client: Client,
    config: DecisionConfig,
}

impl GeminiDecider {
    pub fn new(config: DecisionConfig) -> Result<Self, DecisionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Structured-output schema in Gemini's OpenAPI subset
fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "next_action": { "type": "STRING", "enum": ["CONTINUE_CHAT", "APPOINTMENT"] },
            "reply": { "type": "STRING" },
            "doctor_id": { "type": "STRING" },
            "prediagnosis": { "type": "STRING" }
        },
        "required": ["next_action", "reply", "doctor_id", "prediagnosis"]
    })
}

fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Patient => LLM_ROLE_USER,
        MessageRole::Assistant => LLM_ROLE_MODEL,
    }
}

fn turn(role: &'static str, text: String) -> Content {
    Content {
        role: Some(role),
        parts: vec![Part { text }],
    }
}

fn build_request(request: DecisionRequest, temperature: f32) -> GenerateContentRequest {
    let mut contents: Vec<Content> = request
        .history
        .into_iter()
        .map(|ChatTurn { role, content }| turn(wire_role(role), content))
        .collect();
    contents.push(turn(LLM_ROLE_USER, request.new_message));

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system_context,
            }],
        },
        contents,
        generation_config: GenerationConfig {
            temperature,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    }
}

/// Text of the first part of the first candidate
fn first_candidate_text(body: &str) -> Result<String, DecisionError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| DecisionError::Malformed(e.to_string()))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(DecisionError::EmptyResponse)
}

#[async_trait]
impl TriageDecider for GeminiDecider {
    async fn decide(&self, request: DecisionRequest) -> Result<TriageDecision, DecisionError> {
        let body = build_request(request, self.config.temperature);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(DecisionError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let output = first_candidate_text(&text)?;
        tracing::debug!("Decision model output: {}", output);

        parse_decision(&output)
    }
}

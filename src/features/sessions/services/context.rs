use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::core::error::{AppError, Result};
use crate::features::doctors::models::Doctor;
use crate::features::sessions::models::{Session, SessionDetail};
use crate::modules::decision::RawTriageDecision;
use crate::shared::constants::MAX_PRIOR_SUMMARY_CHARS;
use crate::shared::llm::LlmResponse;
use crate::shared::templates::render_triage_system_prompt;

#[derive(Debug, Serialize)]
struct PatientContext {
    name: String,
    age: String,
    gender: String,
    nationality: String,
}

#[derive(Debug, Serialize)]
struct VitalsContext {
    weight: f64,
    height: f64,
    heart_rate: f64,
    body_temperature: f64,
}

#[derive(Debug, Serialize)]
struct DoctorContext {
    id: String,
    name: String,
    specialty: String,
    room: String,
}

#[derive(Debug, Serialize)]
struct PriorSessionContext {
    date: String,
    weight: f64,
    height: f64,
    heart_rate: f64,
    body_temperature: f64,
    summary: String,
}

/// Everything the decision model is told about the patient and the clinic
#[derive(Debug, Serialize)]
pub struct TriageContext {
    preamble: String,
    json_schema: String,
    patient: PatientContext,
    vitals: VitalsContext,
    doctors: Vec<DoctorContext>,
    history: Vec<PriorSessionContext>,
    current_time: String,
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn prior_context(session: &Session, offset: FixedOffset) -> Option<PriorSessionContext> {
    let summary = session.triage_summary.as_deref()?.trim();
    if summary.is_empty() {
        return None;
    }

    Some(PriorSessionContext {
        date: session
            .created_at
            .with_timezone(&offset)
            .format("%Y-%m-%d")
            .to_string(),
        weight: session.weight,
        height: session.height,
        heart_rate: session.heart_rate,
        body_temperature: session.body_temperature,
        summary: truncate_chars(summary, MAX_PRIOR_SUMMARY_CHARS),
    })
}

impl TriageContext {
    /// `prior_sessions` must be most recent first; only those that ended in
    /// a triage summary are kept.
    pub fn build(
        preamble: &str,
        detail: &SessionDetail,
        doctors: &[Doctor],
        prior_sessions: &[Session],
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        let local_now = now.with_timezone(&offset);
        let patient = &detail.patient;
        let vitals = detail.session.vitals();

        Self {
            preamble: preamble.to_string(),
            json_schema: RawTriageDecision::json_schema_string(),
            patient: PatientContext {
                name: patient.name.clone(),
                age: patient.age_on(local_now.date_naive()).to_string(),
                gender: patient.gender.clone(),
                nationality: patient.nationality.clone(),
            },
            vitals: VitalsContext {
                weight: vitals.weight,
                height: vitals.height,
                heart_rate: vitals.heart_rate,
                body_temperature: vitals.body_temperature,
            },
            doctors: doctors
                .iter()
                .map(|d| DoctorContext {
                    id: d.id.to_string(),
                    name: d.name.clone(),
                    specialty: d.specialty.clone(),
                    room: d.room.clone(),
                })
                .collect(),
            history: prior_sessions
                .iter()
                .filter_map(|s| prior_context(s, offset))
                .collect(),
            current_time: local_now.format("%Y-%m-%d %H:%M %:z").to_string(),
        }
    }

    pub fn render(&self) -> Result<String> {
        render_triage_system_prompt(self).map_err(|e| {
            tracing::error!("Failed to render triage context: {}", e);
            AppError::Internal(format!("Failed to render triage context: {}", e))
        })
    }
}

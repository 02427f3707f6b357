//! Rendering of the triage system context and outbound email bodies.

pub mod engine;

pub use engine::{render_template, TemplateError};

use serde::Serialize;

/// Render the system context handed to the triage decision model
pub fn render_triage_system_prompt<S: Serialize>(ctx: &S) -> Result<String, TemplateError> {
    render_template("prompts/triage_system.jinja", ctx)
}

/// Render the HTML body of the "you are in the queue" email
pub fn render_queue_ticket_email<S: Serialize>(ctx: &S) -> Result<String, TemplateError> {
    render_template("emails/queue_ticket.jinja", ctx)
}

/// Render the HTML body of the one-time code email
pub fn render_otp_email<S: Serialize>(ctx: &S) -> Result<String, TemplateError> {
    render_template("emails/otp_code.jinja", ctx)
}

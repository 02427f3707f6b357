//! Jinja template environment for model prompts and notification bodies.
//!
//! Templates are compiled into the binary so rendering never depends on the
//! working directory of the process.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Global template environment
static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// (name, source) of every bundled template
const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    (
        "prompts/triage_system.jinja",
        include_str!("../../../templates/prompts/triage_system.jinja"),
    ),
    (
        "emails/queue_ticket.jinja",
        include_str!("../../../templates/emails/queue_ticket.jinja"),
    ),
    (
        "emails/otp_code.jinja",
        include_str!("../../../templates/emails/otp_code.jinja"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    // A missing variable is a bug in the caller, not an empty string
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    for (name, source) in BUNDLED_TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        }
    }

    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a bundled template with any serializable context
pub fn render_template<S: Serialize>(template_name: &str, ctx: &S) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

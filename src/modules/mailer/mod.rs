//! Outbound email collaborator.
//!
//! Delivery is best-effort: callers log a failed send and carry on.

mod http_mailer;

pub use http_mailer::HttpMailer;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request to mail service failed: {0}")]
    Transport(String),

    #[error("Mail service returned status {0}")]
    Status(u16),

    #[error("Failed to render email: {0}")]
    Render(String),
}

/// A rendered email ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    /// Plain-text body
    pub body: String,
    pub html: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError>;
}

/// Used when no mail service is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        tracing::info!(
            "Mail service not configured, email to {} not sent: {} | {}",
            email.to,
            email.subject,
            email.body
        );
        Ok(())
    }
}

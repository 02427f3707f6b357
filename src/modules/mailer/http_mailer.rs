use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notifier, NotifyError, OutboundEmail};
use crate::core::config::MailerConfig;

/// Posts emails as JSON to an HTTP mail relay
pub struct HttpMailer {
    client: Client,
    url: String,
    token: String,
    from_address: String,
}

/// Wire format of the mail relay
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    to: &'a str,
    from_email: &'a str,
    subject: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

impl HttpMailer {
    pub fn new(url: String, config: &MailerConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url,
            token: config.service_token.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        let payload = SendEmailRequest {
            to: &email.to,
            from_email: &self.from_address,
            subject: &email.subject,
            body: &email.body,
            html: email.html.as_deref(),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(NotifyError::Status(status.as_u16()));
        }

        tracing::debug!("Email '{}' sent to {}", email.subject, email.to);
        Ok(())
    }
}

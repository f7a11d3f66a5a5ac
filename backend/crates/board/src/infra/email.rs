//! Email Delivery Adapters
//!
//! `HttpEmailSender` posts to a transactional email API authenticated with
//! an `api-key` header. `LogEmailSender` writes the message to the log
//! instead and is used when no provider is configured.

use std::time::Duration;

use serde::Serialize;

use crate::domain::gateway::EmailSender;
use crate::domain::value_object::email::Email;
use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone)]
pub struct EmailApiConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
}

#[derive(Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailApiConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailApiConfig, timeout: Duration) -> BoardResult<Self> {
        let client = platform::http::build_client(timeout)
            .map_err(|e| BoardError::Internal(format!("Failed to build email client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Party<'a>,
    to: [Recipient<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

#[derive(Serialize)]
struct Party<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &Email, subject: &str, html: &str) -> BoardResult<()> {
        let body = SendEmailRequest {
            sender: Party {
                email: &self.config.sender_email,
                name: &self.config.sender_name,
            },
            to: [Recipient { email: to.as_str() }],
            subject,
            html_content: html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BoardError::Gateway(format!("Email request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                detail = %detail,
                recipient_domain = %to.domain(),
                "Email provider rejected message"
            );
            return Err(BoardError::Gateway(format!(
                "Email provider returned {}",
                status
            )));
        }

        tracing::debug!(recipient_domain = %to.domain(), subject, "Email sent");
        Ok(())
    }
}

/// Development sender: logs instead of delivering
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    async fn send(&self, to: &Email, subject: &str, html: &str) -> BoardResult<()> {
        tracing::info!(to = %to.as_str(), subject, body = %html, "Email delivery skipped (log sender)");
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct OtpMessage<'a> {
    to: &'a str,
    subject: &'a str,
    code: &'a str,
    expires_at: DateTime<Utc>,
}

/// Posts OTP messages to an HTTP mail relay.
pub struct WebhookMailer {
    client: Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OtpMailer for WebhookMailer {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        let message = OtpMessage {
            to: email,
            subject: "Your CleanVIT verification code",
            code,
            expires_at,
        };

        let response = self.client.post(&self.url).json(&message).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        info!(to = %email, "OTP handed to mail relay");
        Ok(())
    }
}

/// Writes the code to the log instead of sending it. Used when no relay is
/// configured.
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        info!(to = %email, %code, %expires_at, "OTP issued (no mail relay configured)");
        Ok(())
    }
}

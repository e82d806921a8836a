//! Outbound email notifications.
//!
//! Delivery goes through the Mailgun HTTP API. When Mailgun is not configured
//! a [`DisabledNotifier`] stands in, so callers never branch on configuration.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use storekeep_core::Email;

use crate::config::MailgunConfig;

/// Mailgun API base URL.
const BASE_URL: &str = "https://api.mailgun.net/v3";

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Sends a plain-text message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `subject` and `body` to `recipient`.
    async fn send(&self, recipient: &Email, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Build the notifier for the given configuration.
///
/// # Errors
///
/// Returns error if the HTTP client fails to build.
pub fn from_config(config: Option<&MailgunConfig>) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config {
        Some(config) => Ok(Arc::new(MailgunNotifier::new(config)?)),
        None => {
            tracing::info!("Mailgun not configured, email notifications disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

/// Send a message on a background task.
///
/// Failures are logged; the caller never waits on delivery.
pub fn send_in_background(
    notifier: Arc<dyn Notifier>,
    recipient: Email,
    subject: String,
    body: String,
) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&recipient, &subject, &body).await {
            tracing::warn!(error = %e, recipient = %recipient, "Failed to send notification");
        }
    });
}

/// Mailgun API client.
#[derive(Clone)]
pub struct MailgunNotifier {
    client: reqwest::Client,
    domain: String,
    api_key: SecretString,
    sender: String,
}

impl MailgunNotifier {
    /// Create a new Mailgun client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MailgunConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            domain: config.domain.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{BASE_URL}/{}/messages", self.domain)
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send(&self, recipient: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
        let form = [
            ("from", self.sender.as_str()),
            ("to", recipient.as_str()),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(recipient = %recipient, "Notification sent");
        Ok(())
    }
}

/// Notifier used when no delivery backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, recipient: &Email, subject: &str, _body: &str) -> Result<(), NotifyError> {
        tracing::debug!(recipient = %recipient, subject, "Notifications disabled, dropping message");
        Ok(())
    }
}

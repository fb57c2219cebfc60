//! Notification delivery abstractions.
//!
//! Token issuance commits first, then the notifier runs. A delivery failure
//! therefore reports as its own error kind while the token stays redeemable,
//! so a user who received a slow email can still follow the link.
//!
//! The default for local dev is `LogNotifier`, which logs and returns `Ok(())`.
//! `HttpNotifier` posts the message to a delivery webhook.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Delivery abstraction awaited by the orchestrator after a token commits.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message or return an error to surface a delivery failure.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Local dev notifier that logs the payload instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            to_email = %notification.to_email,
            template = %notification.template,
            payload = %notification.payload_json,
            "notification send stub"
        );
        Ok(())
    }
}

/// Posts notifications to an external delivery endpoint as JSON.
#[derive(Clone, Debug)]
pub struct HttpNotifier {
    client: Client,
    endpoint: Url,
}

impl HttpNotifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build notification client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await
            .context("failed to reach notification endpoint")?;

        let status = response.status();
        if !status.is_success() {
            bail!("notification endpoint returned {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() -> Result<()> {
        let notification = Notification {
            to_email: "a@example.com".to_string(),
            template: "password_reset".to_string(),
            payload_json: "{}".to_string(),
        };
        LogNotifier.notify(&notification).await
    }

    #[test]
    fn notification_serializes_flat() -> Result<()> {
        let notification = Notification {
            to_email: "a@example.com".to_string(),
            template: "password_reset".to_string(),
            payload_json: r#"{"reset_url":"x"}"#.to_string(),
        };
        let json = serde_json::to_value(&notification)?;
        assert_eq!(json["to_email"], "a@example.com");
        assert_eq!(json["template"], "password_reset");
        Ok(())
    }
}

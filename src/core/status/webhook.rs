use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{StatusSink, StatusSinkError, StatusUpdate};
use crate::utils::webhook_signing::signing_headers;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// POSTs status updates as JSON, HMAC-signed when a secret is configured.
#[derive(Clone)]
pub struct WebhookStatusSink {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl std::fmt::Debug for WebhookStatusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookStatusSink")
            .field("url", &self.url)
            .field("signed", &self.secret.is_some())
            .finish()
    }
}

impl WebhookStatusSink {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self, StatusSinkError> {
        let client = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| StatusSinkError::Delivery(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            secret: secret.filter(|s| !s.is_empty()),
        })
    }
}

#[async_trait]
impl StatusSink for WebhookStatusSink {
    async fn publish(&self, update: &StatusUpdate) -> Result<(), StatusSinkError> {
        let payload = serde_json::to_string(update)
            .map_err(|e| StatusSinkError::Delivery(format!("Failed to encode update: {e}")))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.secret {
            let event_id = uuid::Uuid::new_v4().to_string();
            let timestamp = update.timestamp_ms / 1000;
            let headers = signing_headers(secret, timestamp, &event_id, &payload)
                .map_err(StatusSinkError::Signing)?;
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| StatusSinkError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StatusSinkError::Rejected(response.status().as_u16()))
        }
    }
}

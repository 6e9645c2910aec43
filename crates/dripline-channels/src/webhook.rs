//! Outbound delivery via generic HTTP webhook — POST with JSON body.

use async_trait::async_trait;

use dripline_core::config::WebhookConfig;
use dripline_core::error::{DriplineError, Result};
use dripline_core::traits::DeliveryChannel;
use dripline_core::types::{MessagePayload, Recipient};

/// Delivers follow-ups as HTTP POSTs to a configured endpoint.
pub struct WebhookChannel {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, recipient: &Recipient, payload: &MessagePayload) -> Result<()> {
        let body = serde_json::json!({
            "recipient_id": recipient.id,
            "recipient_name": recipient.name,
            "phone": recipient.phone,
            "text": payload.text,
            "document_url": payload.document_url,
            "image_url": payload.image_url,
            "sent_at": chrono::Utc::now().to_rfc3339(),
        });

        let mut req = self
            .client
            .post(&self.config.url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(10));
        for (key, value) in &self.config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DriplineError::delivery(format!("webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ webhook delivery to {} for {}", self.config.url, recipient.id);
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(DriplineError::delivery(format!("webhook error {status}: {body}")))
        }
    }
}

//! Console delivery — logs the dispatch instead of sending it anywhere.
//! The default channel when no webhook is configured; useful for dry runs.

use async_trait::async_trait;

use dripline_core::error::Result;
use dripline_core::traits::DeliveryChannel;
use dripline_core::types::{MessagePayload, Recipient};

pub struct ConsoleChannel;

#[async_trait]
impl DeliveryChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, recipient: &Recipient, payload: &MessagePayload) -> Result<()> {
        tracing::info!(
            "📢 [console] → {} ({}): {}",
            recipient.name,
            recipient.id,
            payload.text
        );
        if let Some(doc) = &payload.document_url {
            tracing::info!("📎 [console]   attachment: {doc}");
        }
        if let Some(img) = &payload.image_url {
            tracing::info!("🖼 [console]   image: {img}");
        }
        Ok(())
    }
}

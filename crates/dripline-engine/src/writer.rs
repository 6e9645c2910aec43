//! Schedule writer — idempotent persistence of compiled batches.

use std::sync::Arc;

use dripline_core::error::Result;
use dripline_core::traits::ScheduleStore;
use dripline_core::types::ScheduleEntry;

/// What happened to one recipient's compiled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Batch persisted; count of rows actually inserted.
    Written(usize),
    /// The recipient already had entries for this template; the whole batch
    /// was skipped.
    SkippedExisting,
}

/// Persists compiled schedule entries, skipping recipients that already
/// have a schedule for the template.
pub struct ScheduleWriter {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleWriter {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Write one recipient's batch. The idempotency guard is at the
    /// template grain: any existing entry for `(recipient, template)` skips
    /// the entire batch, not just duplicate messages. The store's unique
    /// index on the full triple backstops concurrent compile passes.
    pub async fn write_batch(
        &self,
        recipient_id: &str,
        template_id: &str,
        entries: Vec<ScheduleEntry>,
    ) -> Result<WriteOutcome> {
        if self.store.exists(recipient_id, template_id).await? {
            tracing::debug!(
                "recipient {recipient_id} already scheduled for template {template_id}, skipping"
            );
            return Ok(WriteOutcome::SkippedExisting);
        }

        if entries.is_empty() {
            return Ok(WriteOutcome::Written(0));
        }

        let inserted = self.store.insert_many(&entries).await?;
        tracing::info!(
            "📨 scheduled {inserted} message(s) for recipient {recipient_id} (template {template_id})"
        );
        Ok(WriteOutcome::Written(inserted))
    }
}

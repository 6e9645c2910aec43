//! Due-entry executor — dispatches schedule entries whose fire time has
//! passed and records the outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use dripline_core::error::Result;
use dripline_core::traits::{DeliveryChannel, HistoryLog, RecipientStore, ScheduleStore};

use crate::timing;

/// Outcome counts for one due-batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Entries the due query returned.
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Entries left pending because `now` fell outside their dispatch window.
    pub deferred: usize,
}

/// Processes due schedule entries: `Pending → {Sent | Failed}`, one-way.
///
/// Owns no timer loop — one call handles one bounded due-batch and is meant
/// to be invoked on a short fixed interval by an external trigger. Failed
/// deliveries are terminal; re-triggering is a human or remediation-job
/// decision, never automatic.
pub struct DueEntryExecutor {
    schedules: Arc<dyn ScheduleStore>,
    recipients: Arc<dyn RecipientStore>,
    channel: Arc<dyn DeliveryChannel>,
    history: Arc<dyn HistoryLog>,
    page_size: usize,
    enforce_active_hours: bool,
}

impl DueEntryExecutor {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        recipients: Arc<dyn RecipientStore>,
        channel: Arc<dyn DeliveryChannel>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        Self {
            schedules,
            recipients,
            channel,
            history,
            page_size: 50,
            enforce_active_hours: true,
        }
    }

    /// Bound the work per invocation.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Disable the active-hours dispatch gate.
    pub fn with_active_hours_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_active_hours = enforce;
        self
    }

    /// Process one due-batch for a tenant.
    pub async fn execute_due_batch(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ExecutionReport> {
        let due = self.schedules.query_due(tenant_id, now, self.page_size).await?;
        let mut report = ExecutionReport { due: due.len(), ..Default::default() };

        for entry in due {
            if self.enforce_active_hours
                && let Some(window) = &entry.active_hours
            {
                match timing::within_active_hours(window, now) {
                    Ok(true) => {}
                    Ok(false) => {
                        // Left pending; a later tick inside the window
                        // picks it up.
                        report.deferred += 1;
                        continue;
                    }
                    Err(e) => {
                        // The compiler validates windows, so this only
                        // happens with hand-edited data. Dispatch anyway
                        // rather than strand the entry.
                        tracing::warn!("⚠️ entry {} has a bad dispatch window: {e}", entry.id);
                    }
                }
            }

            let recipient = match self.recipients.get(&entry.recipient_id).await? {
                Some(r) => r,
                None => {
                    self.schedules.mark_failed(&entry.id, "recipient not found").await?;
                    report.failed += 1;
                    continue;
                }
            };

            match self.channel.send(&recipient, &entry.payload).await {
                Ok(()) => {
                    self.schedules.mark_sent(&entry.id, now).await?;
                    // Delivered follow-ups show up in normal conversation
                    // history; a history failure does not un-send the entry.
                    if let Err(e) = self
                        .history
                        .append(&entry.recipient_id, &entry.payload, "follow-up")
                        .await
                    {
                        tracing::warn!("⚠️ history append failed for entry {}: {e}", entry.id);
                    }
                    report.sent += 1;
                }
                Err(e) => {
                    self.schedules.mark_failed(&entry.id, &e.to_string()).await?;
                    tracing::warn!("⚠️ delivery failed for entry {}: {e}", entry.id);
                    report.failed += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                "📤 tenant {tenant_id}: {} due, {} sent, {} failed, {} deferred",
                report.due,
                report.sent,
                report.failed,
                report.deferred
            );
        }
        Ok(report)
    }
}

//! Collaborator contracts — the narrow seams between the engine and the
//! outside world. No wire format or storage product is prescribed here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{FollowUpTemplate, MessagePayload, Recipient, ScheduleEntry, TemplateMessage};

/// Read access to follow-up templates and their ordered message lists.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Active templates for a tenant.
    async fn list_active(&self, tenant_id: &str) -> Result<Vec<FollowUpTemplate>>;

    /// Messages of a template, ordered by `(day_number, sequence)`.
    async fn list_messages(&self, template_id: &str) -> Result<Vec<TemplateMessage>>;
}

/// Read access to the external recipient directory.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Recipients whose tag set intersects `tags` (any-match).
    async fn find_by_tags(&self, tenant_id: &str, tags: &[String]) -> Result<Vec<Recipient>>;

    /// Look up a single recipient.
    async fn get(&self, recipient_id: &str) -> Result<Option<Recipient>>;
}

/// Durable schedule-entry storage.
///
/// Implementations must enforce uniqueness on the
/// `(recipient_id, template_id, message_id)` triple: a duplicate insert is
/// ignored, not doubled. That closes the check-then-insert race between
/// concurrent compile passes.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Whether the recipient already has any entry for this template.
    async fn exists(&self, recipient_id: &str, template_id: &str) -> Result<bool>;

    /// Insert a compiled batch as pending entries. Returns how many rows
    /// were actually inserted (duplicates are skipped).
    async fn insert_many(&self, entries: &[ScheduleEntry]) -> Result<usize>;

    /// Pending entries with `fire_at <= now`, oldest first, at most `limit`.
    async fn query_due(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduleEntry>>;

    /// Transition a pending entry to sent. A no-op if the entry already
    /// reached a terminal status.
    async fn mark_sent(&self, entry_id: &str, sent_at: DateTime<Utc>) -> Result<()>;

    /// Transition a pending entry to failed, capturing the reason. A no-op
    /// if the entry already reached a terminal status.
    async fn mark_failed(&self, entry_id: &str, error: &str) -> Result<()>;
}

/// The outbound transport. What the wire actually is (chat API, SMS
/// gateway, webhook) is the implementation's business.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, recipient: &Recipient, payload: &MessagePayload) -> Result<()>;
}

/// Conversation-history sink, so delivered follow-ups show up in the
/// recipient's normal message history.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(
        &self,
        recipient_id: &str,
        payload: &MessagePayload,
        source_tag: &str,
    ) -> Result<()>;
}

/// External text-matching capability for keyword triggers. The engine
/// consumes this; it never implements message-history search itself.
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    async fn find_by_keywords(&self, tenant_id: &str, keywords: &[String])
    -> Result<Vec<Recipient>>;
}

//! In-memory collaborator doubles and fixture builders for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dripline_core::error::{DriplineError, Result};
use dripline_core::traits::{
    DeliveryChannel, HistoryLog, KeywordIndex, RecipientStore, ScheduleStore, TemplateStore,
};
use dripline_core::types::{
    BatchSettings, DelayAfter, EntryStatus, FollowUpTemplate, MessagePayload, Recipient,
    ScheduleEntry, StartPolicy, TemplateMessage, TemplateStatus,
};

// ─── Fixture builders ──────────────────────────────────────

pub fn template(id: &str, tenant_id: &str) -> FollowUpTemplate {
    FollowUpTemplate {
        id: id.into(),
        tenant_id: tenant_id.into(),
        name: format!("template {id}"),
        status: TemplateStatus::Active,
        start_policy: StartPolicy::Immediate,
        trigger_tags: vec![],
        trigger_keywords: vec![],
        batch: BatchSettings::default(),
        created_at: Utc::now(),
    }
}

pub fn message(
    id: &str,
    template_id: &str,
    day_number: u32,
    sequence: u32,
    delay_after: Option<DelayAfter>,
) -> TemplateMessage {
    TemplateMessage {
        id: id.into(),
        template_id: template_id.into(),
        day_number,
        sequence,
        text: format!("message {id}"),
        document_url: None,
        image_url: None,
        delay_after,
        use_scheduled_time: false,
        scheduled_time: None,
    }
}

pub fn recipient(id: &str, tenant_id: &str) -> Recipient {
    Recipient {
        id: id.into(),
        tenant_id: tenant_id.into(),
        name: format!("recipient {id}"),
        phone: None,
        tags: vec![],
    }
}

// ─── Template store double ──────────────────────────────────────

#[derive(Default)]
pub struct MemTemplates {
    pub templates: Vec<FollowUpTemplate>,
    pub messages: HashMap<String, Vec<TemplateMessage>>,
}

#[async_trait]
impl TemplateStore for MemTemplates {
    async fn list_active(&self, tenant_id: &str) -> Result<Vec<FollowUpTemplate>> {
        Ok(self
            .templates
            .iter()
            .filter(|t| t.tenant_id == tenant_id && t.status == TemplateStatus::Active)
            .cloned()
            .collect())
    }

    async fn list_messages(&self, template_id: &str) -> Result<Vec<TemplateMessage>> {
        Ok(self.messages.get(template_id).cloned().unwrap_or_default())
    }
}

// ─── Recipient store double ──────────────────────────────────────

#[derive(Default)]
pub struct MemRecipients {
    pub recipients: Vec<Recipient>,
}

#[async_trait]
impl RecipientStore for MemRecipients {
    async fn find_by_tags(&self, tenant_id: &str, tags: &[String]) -> Result<Vec<Recipient>> {
        Ok(self
            .recipients
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect())
    }

    async fn get(&self, recipient_id: &str) -> Result<Option<Recipient>> {
        Ok(self.recipients.iter().find(|r| r.id == recipient_id).cloned())
    }
}

// ─── Keyword index double ──────────────────────────────────────

pub struct MemKeywords {
    pub hits: Vec<Recipient>,
}

#[async_trait]
impl KeywordIndex for MemKeywords {
    async fn find_by_keywords(
        &self,
        _tenant_id: &str,
        _keywords: &[String],
    ) -> Result<Vec<Recipient>> {
        Ok(self.hits.clone())
    }
}

// ─── Schedule store double ──────────────────────────────────────

/// Mirrors the SQLite store's semantics: triple uniqueness on insert and
/// terminal-status guards on the mark operations.
#[derive(Default)]
pub struct MemSchedules {
    pub entries: Mutex<Vec<ScheduleEntry>>,
}

#[async_trait]
impl ScheduleStore for MemSchedules {
    async fn exists(&self, recipient_id: &str, template_id: &str) -> Result<bool> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .any(|e| e.recipient_id == recipient_id && e.template_id == template_id))
    }

    async fn insert_many(&self, batch: &[ScheduleEntry]) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap();
        let mut inserted = 0;
        for entry in batch {
            let duplicate = entries.iter().any(|e| {
                e.recipient_id == entry.recipient_id
                    && e.template_id == entry.template_id
                    && e.message_id == entry.message_id
            });
            if !duplicate {
                entries.push(entry.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn query_due(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduleEntry>> {
        let entries = self.entries.lock().unwrap();
        let mut due: Vec<ScheduleEntry> = entries
            .iter()
            .filter(|e| {
                e.tenant_id == tenant_id && e.status == EntryStatus::Pending && e.fire_at <= now
            })
            .cloned()
            .collect();
        due.sort_by_key(|e| e.fire_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_sent(&self, entry_id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(e) = entries
            .iter_mut()
            .find(|e| e.id == entry_id && e.status == EntryStatus::Pending)
        {
            e.status = EntryStatus::Sent;
            e.sent_at = Some(sent_at);
        }
        Ok(())
    }

    async fn mark_failed(&self, entry_id: &str, error: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(e) = entries
            .iter_mut()
            .find(|e| e.id == entry_id && e.status == EntryStatus::Pending)
        {
            e.status = EntryStatus::Failed;
            e.error = Some(error.to_string());
        }
        Ok(())
    }
}

// ─── Delivery channel double ──────────────────────────────────────

#[derive(Default)]
pub struct MockChannel {
    /// Recipient ids whose sends fail.
    pub fail_for: HashSet<String>,
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, recipient: &Recipient, payload: &MessagePayload) -> Result<()> {
        if self.fail_for.contains(&recipient.id) {
            return Err(DriplineError::delivery(format!(
                "simulated failure for {}",
                recipient.id
            )));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.id.clone(), payload.text.clone()));
        Ok(())
    }
}

// ─── History log double ──────────────────────────────────────

#[derive(Default)]
pub struct MemHistory {
    pub rows: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl HistoryLog for MemHistory {
    async fn append(
        &self,
        recipient_id: &str,
        payload: &MessagePayload,
        source_tag: &str,
    ) -> Result<()> {
        self.rows.lock().unwrap().push((
            recipient_id.to_string(),
            payload.text.clone(),
            source_tag.to_string(),
        ));
        Ok(())
    }
}

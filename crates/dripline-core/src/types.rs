//! Data model — templates, messages, recipients, and schedule entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reusable follow-up definition: an ordered message sequence plus the
/// trigger criteria and batch settings that govern how it is scheduled.
///
/// Templates are authored by an external surface and are read-only to the
/// engine. Deactivating one halts future compilation but does not cancel
/// schedule entries already written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpTemplate {
    /// Unique template ID.
    pub id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Human-readable name.
    pub name: String,
    /// Only `Active` templates are processed.
    pub status: TemplateStatus,
    /// When the first chained message starts counting.
    pub start_policy: StartPolicy,
    /// Recipients whose tag set intersects these are matched (any-match).
    #[serde(default)]
    pub trigger_tags: Vec<String>,
    /// Keyword criteria, resolved by an external text-matching collaborator.
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    /// Jitter, sleep window, and throughput knobs.
    #[serde(default)]
    pub batch: BatchSettings,
    pub created_at: DateTime<Utc>,
}

/// Template lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Inactive,
}

/// When the first message of a sequence starts counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StartPolicy {
    /// Start from the moment of compilation.
    Immediate,
    /// Start 24 hours after compilation.
    Delayed24h,
    /// Start at an explicit absolute time.
    Custom { start_at: DateTime<Utc> },
}

impl Default for StartPolicy {
    fn default() -> Self {
        Self::Immediate
    }
}

/// One step inside a template, identified by `(template_id, sequence)`.
/// `day_number` is a 1-based advisory day marker, meaningful only when
/// `use_scheduled_time` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub id: String,
    pub template_id: String,
    /// 1-based calendar day marker.
    pub day_number: u32,
    /// Position within the template.
    pub sequence: u32,
    /// Message text, snapshotted into the schedule entry at compile time.
    pub text: String,
    pub document_url: Option<String>,
    pub image_url: Option<String>,
    /// Offset from the previous message's final computed time (or from the
    /// template start, for the first message). `None` on a chained message
    /// falls back to 5 minutes.
    pub delay_after: Option<DelayAfter>,
    /// When set, this message anchors to a calendar day at `scheduled_time`
    /// instead of chaining from the previous message.
    #[serde(default)]
    pub use_scheduled_time: bool,
    /// "HH:MM" time-of-day, required when `use_scheduled_time` is set.
    pub scheduled_time: Option<String>,
}

/// Per-message delay rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayAfter {
    pub value: i64,
    pub unit: DelayUnit,
    /// An instantaneous first message gets no offset beyond the start
    /// policy; an instantaneous chained message gets a fixed one-minute
    /// separation, never truly zero.
    #[serde(default)]
    pub is_instantaneous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
}

/// Per-template batch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Jitter range added to every compiled message time.
    #[serde(default)]
    pub message_delay: JitterRange,
    /// Business-hours window for dispatch.
    #[serde(default)]
    pub sleep: SleepSettings,
    /// Cap on newly scheduled recipients per orchestrator pass (0 = no cap).
    #[serde(default)]
    pub contacts_per_batch: u32,
    /// Cadence metadata for the external trigger; not used in per-message
    /// time computation.
    #[serde(default)]
    pub repeat_every: u32,
    #[serde(default)]
    pub is_neverending: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            message_delay: JitterRange::default(),
            sleep: SleepSettings::default(),
            contacts_per_batch: 0,
            repeat_every: 0,
            is_neverending: false,
        }
    }
}

/// A randomized delay range, uniform over `[min, max]` inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterRange {
    pub min: i64,
    pub max: i64,
    pub unit: JitterUnit,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self { min: 0, max: 0, unit: JitterUnit::Minutes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterUnit {
    Seconds,
    Minutes,
}

/// Business-hours window settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub active_hours: ActiveHours,
}

/// An "HH:MM".."HH:MM" time-of-day window. May wrap past midnight
/// (e.g. 20:00–06:00).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveHours {
    pub start: String,
    pub end: String,
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self { start: "08:00".into(), end: "20:00".into() }
    }
}

/// A contact from the external recipient directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What gets delivered: text plus optional attachments. A closed shape,
/// not an open bag of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub text: String,
    pub document_url: Option<String>,
    pub image_url: Option<String>,
}

/// The durable, atomic unit of work: one compiled message for one recipient
/// with an absolute fire time.
///
/// At most one entry exists per `(recipient_id, template_id, message_id)`
/// triple. Entries are created `Pending` and move exactly once to `Sent` or
/// `Failed`; the engine never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub tenant_id: String,
    pub recipient_id: String,
    pub template_id: String,
    pub message_id: String,
    /// Absolute time at which this entry becomes due.
    pub fire_at: DateTime<Utc>,
    pub status: EntryStatus,
    /// Snapshot of the message taken at compile time; later template edits
    /// do not change it.
    pub payload: MessagePayload,
    /// Dispatch window snapshot, present when the template had sleep
    /// settings enabled. The executor defers entries outside the window.
    pub active_hours: Option<ActiveHours>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Entry status. `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Sent,
    Failed,
}

impl ScheduleEntry {
    /// Create a pending entry for a compiled `(message, recipient)` pair.
    pub fn pending(
        tenant_id: &str,
        recipient_id: &str,
        template_id: &str,
        message_id: &str,
        fire_at: DateTime<Utc>,
        payload: MessagePayload,
        active_hours: Option<ActiveHours>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            recipient_id: recipient_id.to_string(),
            template_id: template_id.to_string(),
            message_id: message_id.to_string(),
            fire_at,
            status: EntryStatus::Pending,
            payload,
            active_hours,
            created_at: now,
            sent_at: None,
            error: None,
        }
    }
}

impl TemplateMessage {
    /// The payload snapshot this message produces.
    pub fn payload(&self) -> MessagePayload {
        MessagePayload {
            text: self.text.clone(),
            document_url: self.document_url.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

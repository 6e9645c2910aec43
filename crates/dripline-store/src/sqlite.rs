//! SQLite persistence for templates, recipients, schedule entries, and
//! message history. RFC 3339 text timestamps, JSON text for nested values.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use dripline_core::error::{DriplineError, Result};
use dripline_core::traits::{HistoryLog, RecipientStore, ScheduleStore, TemplateStore};
use dripline_core::types::{
    BatchSettings, EntryStatus, FollowUpTemplate, MessagePayload, Recipient, ScheduleEntry,
    StartPolicy, TemplateMessage, TemplateStatus,
};

/// SQLite-backed store implementing all Dripline store contracts.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: impl std::fmt::Display) -> DriplineError {
    DriplineError::store(e.to_string())
}

impl SqliteStore {
    /// Open or create the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database, handy for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                start_policy TEXT NOT NULL DEFAULT 'immediate',   -- 'immediate', 'delayed24h', 'custom'
                start_at TEXT,                                    -- set when start_policy = 'custom'
                trigger_tags TEXT NOT NULL DEFAULT '[]',          -- JSON array
                trigger_keywords TEXT NOT NULL DEFAULT '[]',      -- JSON array
                batch_settings TEXT NOT NULL DEFAULT '{}',        -- JSON
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS template_messages (
                id TEXT PRIMARY KEY,
                template_id TEXT NOT NULL,
                day_number INTEGER NOT NULL DEFAULT 1,
                sequence INTEGER NOT NULL,
                text TEXT NOT NULL,
                document_url TEXT,
                image_url TEXT,
                delay_after TEXT,                                 -- JSON, NULL = default chain delay
                use_scheduled_time INTEGER NOT NULL DEFAULT 0,
                scheduled_time TEXT,
                FOREIGN KEY (template_id) REFERENCES templates(id)
            );

            CREATE TABLE IF NOT EXISTS recipients (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                phone TEXT,
                tags TEXT NOT NULL DEFAULT '[]'                   -- JSON array
            );

            CREATE TABLE IF NOT EXISTS schedule_entries (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                template_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                fire_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',           -- pending, sent, failed
                payload TEXT NOT NULL,                            -- JSON
                active_hours TEXT,                                -- JSON window snapshot
                created_at TEXT NOT NULL,
                sent_at TEXT,
                error TEXT
            );

            -- One entry per (recipient, template, message); duplicate
            -- inserts from racing compile passes are ignored.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_triple
                ON schedule_entries (recipient_id, template_id, message_id);
            CREATE INDEX IF NOT EXISTS idx_entries_due
                ON schedule_entries (tenant_id, status, fire_at);

            CREATE TABLE IF NOT EXISTS message_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id TEXT NOT NULL,
                payload TEXT NOT NULL,                            -- JSON
                source_tag TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            ",
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ─── Authoring helpers (seed path and tests) ──────────────────────

    /// Insert or replace a template.
    pub fn upsert_template(&self, template: &FollowUpTemplate) -> Result<()> {
        let (policy, start_at) = match &template.start_policy {
            StartPolicy::Immediate => ("immediate", None),
            StartPolicy::Delayed24h => ("delayed24h", None),
            StartPolicy::Custom { start_at } => ("custom", Some(start_at.to_rfc3339())),
        };
        let status = match template.status {
            TemplateStatus::Active => "active",
            TemplateStatus::Inactive => "inactive",
        };
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO templates
             (id, tenant_id, name, status, start_policy, start_at, trigger_tags,
              trigger_keywords, batch_settings, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                template.id,
                template.tenant_id,
                template.name,
                status,
                policy,
                start_at,
                serde_json::to_string(&template.trigger_tags).map_err(db_err)?,
                serde_json::to_string(&template.trigger_keywords).map_err(db_err)?,
                serde_json::to_string(&template.batch).map_err(db_err)?,
                template.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Insert or replace a template message.
    pub fn upsert_message(&self, message: &TemplateMessage) -> Result<()> {
        let delay = match &message.delay_after {
            Some(d) => Some(serde_json::to_string(d).map_err(db_err)?),
            None => None,
        };
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO template_messages
             (id, template_id, day_number, sequence, text, document_url, image_url,
              delay_after, use_scheduled_time, scheduled_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                message.id,
                message.template_id,
                message.day_number,
                message.sequence,
                message.text,
                message.document_url,
                message.image_url,
                delay,
                message.use_scheduled_time as i32,
                message.scheduled_time,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Insert or replace a recipient.
    pub fn upsert_recipient(&self, recipient: &Recipient) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO recipients (id, tenant_id, name, phone, tags)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                recipient.id,
                recipient.tenant_id,
                recipient.name,
                recipient.phone,
                serde_json::to_string(&recipient.tags).map_err(db_err)?,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Recent history rows for a recipient, newest first.
    pub fn recent_history(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<(MessagePayload, String)>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT payload, source_tag FROM message_history
                 WHERE recipient_id = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params![recipient_id, limit as i64], |row| {
                let payload_json: String = row.get(0)?;
                let source_tag: String = row.get(1)?;
                Ok((payload_json, source_tag))
            })
            .map_err(db_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (payload_json, source_tag) = row.map_err(db_err)?;
            let payload = serde_json::from_str(&payload_json).map_err(db_err)?;
            out.push((payload, source_tag));
        }
        Ok(out)
    }

    // ─── Row mapping ──────────────────────

    fn template_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FollowUpTemplate> {
        let status: String = row.get("status")?;
        let policy: String = row.get("start_policy")?;
        let start_at: Option<String> = row.get("start_at")?;
        let tags_json: String = row.get("trigger_tags")?;
        let keywords_json: String = row.get("trigger_keywords")?;
        let batch_json: String = row.get("batch_settings")?;
        let created_at: String = row.get("created_at")?;

        let start_policy = match policy.as_str() {
            "delayed24h" => StartPolicy::Delayed24h,
            "custom" => StartPolicy::Custom {
                start_at: start_at
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now),
            },
            _ => StartPolicy::Immediate,
        };

        Ok(FollowUpTemplate {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            status: if status == "inactive" {
                TemplateStatus::Inactive
            } else {
                TemplateStatus::Active
            },
            start_policy,
            trigger_tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            trigger_keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
            batch: serde_json::from_str::<BatchSettings>(&batch_json).unwrap_or_default(),
            created_at: parse_ts(&created_at),
        })
    }

    fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TemplateMessage> {
        let delay_json: Option<String> = row.get("delay_after")?;
        Ok(TemplateMessage {
            id: row.get("id")?,
            template_id: row.get("template_id")?,
            day_number: row.get("day_number")?,
            sequence: row.get("sequence")?,
            text: row.get("text")?,
            document_url: row.get("document_url")?,
            image_url: row.get("image_url")?,
            delay_after: delay_json.and_then(|j| serde_json::from_str(&j).ok()),
            use_scheduled_time: row.get::<_, i32>("use_scheduled_time")? != 0,
            scheduled_time: row.get("scheduled_time")?,
        })
    }

    fn recipient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
        let tags_json: String = row.get("tags")?;
        Ok(Recipient {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            name: row.get("name")?,
            phone: row.get("phone")?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        })
    }

    fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleEntry> {
        let status: String = row.get("status")?;
        let payload_json: String = row.get("payload")?;
        let window_json: Option<String> = row.get("active_hours")?;
        let fire_at: String = row.get("fire_at")?;
        let created_at: String = row.get("created_at")?;
        let sent_at: Option<String> = row.get("sent_at")?;

        Ok(ScheduleEntry {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            recipient_id: row.get("recipient_id")?,
            template_id: row.get("template_id")?,
            message_id: row.get("message_id")?,
            fire_at: parse_ts(&fire_at),
            status: match status.as_str() {
                "sent" => EntryStatus::Sent,
                "failed" => EntryStatus::Failed,
                _ => EntryStatus::Pending,
            },
            payload: serde_json::from_str(&payload_json).unwrap_or(MessagePayload {
                text: String::new(),
                document_url: None,
                image_url: None,
            }),
            active_hours: window_json.and_then(|j| serde_json::from_str(&j).ok()),
            created_at: parse_ts(&created_at),
            sent_at: sent_at.as_deref().map(parse_ts),
            error: row.get("error")?,
        })
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TemplateStore for SqliteStore {
    async fn list_active(&self, tenant_id: &str) -> Result<Vec<FollowUpTemplate>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM templates
                 WHERE tenant_id = ?1 AND status = 'active' ORDER BY created_at",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([tenant_id], |row| Self::template_from_row(row))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    async fn list_messages(&self, template_id: &str) -> Result<Vec<TemplateMessage>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM template_messages
                 WHERE template_id = ?1 ORDER BY day_number, sequence",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([template_id], |row| Self::message_from_row(row))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }
}

#[async_trait]
impl RecipientStore for SqliteStore {
    async fn find_by_tags(&self, tenant_id: &str, tags: &[String]) -> Result<Vec<Recipient>> {
        // Tag sets are small JSON arrays; intersect in Rust rather than
        // depending on the json1 extension.
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT * FROM recipients WHERE tenant_id = ?1 ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([tenant_id], |row| Self::recipient_from_row(row))
            .map_err(db_err)?;

        let mut out = Vec::new();
        for row in rows {
            let recipient = row.map_err(db_err)?;
            if recipient.tags.iter().any(|t| tags.contains(t)) {
                out.push(recipient);
            }
        }
        Ok(out)
    }

    async fn get(&self, recipient_id: &str) -> Result<Option<Recipient>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT * FROM recipients WHERE id = ?1")
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map([recipient_id], |row| Self::recipient_from_row(row))
            .map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn exists(&self, recipient_id: &str, template_id: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(db_err)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM schedule_entries
                 WHERE recipient_id = ?1 AND template_id = ?2",
                rusqlite::params![recipient_id, template_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn insert_many(&self, entries: &[ScheduleEntry]) -> Result<usize> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut inserted = 0;
        for entry in entries {
            let status = match entry.status {
                EntryStatus::Pending => "pending",
                EntryStatus::Sent => "sent",
                EntryStatus::Failed => "failed",
            };
            let window = match &entry.active_hours {
                Some(w) => Some(serde_json::to_string(w).map_err(db_err)?),
                None => None,
            };
            inserted += conn
                .execute(
                    "INSERT OR IGNORE INTO schedule_entries
                     (id, tenant_id, recipient_id, template_id, message_id, fire_at,
                      status, payload, active_hours, created_at, sent_at, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    rusqlite::params![
                        entry.id,
                        entry.tenant_id,
                        entry.recipient_id,
                        entry.template_id,
                        entry.message_id,
                        entry.fire_at.to_rfc3339(),
                        status,
                        serde_json::to_string(&entry.payload).map_err(db_err)?,
                        window,
                        entry.created_at.to_rfc3339(),
                        entry.sent_at.map(|t| t.to_rfc3339()),
                        entry.error,
                    ],
                )
                .map_err(db_err)?;
        }
        if inserted < entries.len() {
            tracing::debug!(
                "💾 {} of {} entries inserted, rest were duplicates",
                inserted,
                entries.len()
            );
        }
        Ok(inserted)
    }

    async fn query_due(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM schedule_entries
                 WHERE tenant_id = ?1 AND status = 'pending' AND fire_at <= ?2
                 ORDER BY fire_at LIMIT ?3",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params![tenant_id, now.to_rfc3339(), limit as i64],
                |row| Self::entry_from_row(row),
            )
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    async fn mark_sent(&self, entry_id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        // The status guard keeps terminal entries terminal.
        conn.execute(
            "UPDATE schedule_entries SET status = 'sent', sent_at = ?1
             WHERE id = ?2 AND status = 'pending'",
            rusqlite::params![sent_at.to_rfc3339(), entry_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn mark_failed(&self, entry_id: &str, error: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "UPDATE schedule_entries SET status = 'failed', error = ?1
             WHERE id = ?2 AND status = 'pending'",
            rusqlite::params![error, entry_id],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryLog for SqliteStore {
    async fn append(
        &self,
        recipient_id: &str,
        payload: &MessagePayload,
        source_tag: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT INTO message_history (recipient_id, payload, source_tag, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                recipient_id,
                serde_json::to_string(payload).map_err(db_err)?,
                source_tag,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dripline_core::types::ActiveHours;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn template(id: &str, tenant: &str, status: TemplateStatus) -> FollowUpTemplate {
        FollowUpTemplate {
            id: id.into(),
            tenant_id: tenant.into(),
            name: format!("template {id}"),
            status,
            start_policy: StartPolicy::Immediate,
            trigger_tags: vec!["lead".into()],
            trigger_keywords: vec![],
            batch: BatchSettings::default(),
            created_at: Utc::now(),
        }
    }

    fn entry(recipient: &str, template: &str, message: &str, fire_at: DateTime<Utc>) -> ScheduleEntry {
        ScheduleEntry::pending(
            "acme",
            recipient,
            template,
            message,
            fire_at,
            MessagePayload { text: "hello".into(), document_url: None, image_url: None },
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_list_active_filters_status_and_tenant() {
        let s = store();
        s.upsert_template(&template("t1", "acme", TemplateStatus::Active)).unwrap();
        s.upsert_template(&template("t2", "acme", TemplateStatus::Inactive)).unwrap();
        s.upsert_template(&template("t3", "globex", TemplateStatus::Active)).unwrap();

        let active = s.list_active("acme").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "t1");
    }

    #[tokio::test]
    async fn test_start_policy_roundtrip() {
        let s = store();
        let start_at = Utc::now() + Duration::days(1);
        let mut tpl = template("t1", "acme", TemplateStatus::Active);
        tpl.start_policy = StartPolicy::Custom { start_at };
        s.upsert_template(&tpl).unwrap();

        let loaded = s.list_active("acme").await.unwrap();
        match &loaded[0].start_policy {
            StartPolicy::Custom { start_at: loaded_at } => {
                assert_eq!(loaded_at.timestamp(), start_at.timestamp());
            }
            other => panic!("expected custom start policy, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_messages_come_back_ordered() {
        let s = store();
        s.upsert_template(&template("t1", "acme", TemplateStatus::Active)).unwrap();
        for (id, day, seq) in [("m3", 2u32, 1u32), ("m1", 1, 1), ("m2", 1, 2)] {
            s.upsert_message(&TemplateMessage {
                id: id.into(),
                template_id: "t1".into(),
                day_number: day,
                sequence: seq,
                text: format!("msg {id}"),
                document_url: None,
                image_url: None,
                delay_after: None,
                use_scheduled_time: false,
                scheduled_time: None,
            })
            .unwrap();
        }

        let messages = s.list_messages("t1").await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_find_by_tags_any_match() {
        let s = store();
        for (id, tags) in [("r1", vec!["lead", "vip"]), ("r2", vec!["customer"]), ("r3", vec!["vip"])] {
            s.upsert_recipient(&Recipient {
                id: id.into(),
                tenant_id: "acme".into(),
                name: id.into(),
                phone: None,
                tags: tags.into_iter().map(String::from).collect(),
            })
            .unwrap();
        }

        let matched = s.find_by_tags("acme", &["vip".to_string()]).await.unwrap();
        let ids: Vec<&str> = matched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);

        assert!(s.get("r2").await.unwrap().is_some());
        assert!(s.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_many_ignores_duplicate_triples() {
        let s = store();
        let fire_at = Utc::now() + Duration::minutes(10);
        let first = entry("r1", "t1", "m1", fire_at);

        assert_eq!(s.insert_many(&[first.clone()]).await.unwrap(), 1);

        // Same triple, different row id — a racing compile pass.
        let duplicate = entry("r1", "t1", "m1", fire_at + Duration::minutes(5));
        let fresh = entry("r1", "t1", "m2", fire_at);
        assert_eq!(s.insert_many(&[duplicate, fresh]).await.unwrap(), 1);

        assert!(s.exists("r1", "t1").await.unwrap());
        assert!(!s.exists("r2", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_due_bounds_and_order() {
        let s = store();
        let now = Utc::now();
        s.insert_many(&[
            entry("r1", "t1", "m1", now - Duration::minutes(30)),
            entry("r1", "t1", "m2", now - Duration::minutes(10)),
            entry("r1", "t1", "m3", now - Duration::minutes(20)),
            entry("r1", "t1", "m4", now + Duration::minutes(10)),
        ])
        .await
        .unwrap();

        let due = s.query_due("acme", now, 2).await.unwrap();
        assert_eq!(due.len(), 2);
        // Oldest first
        assert_eq!(due[0].message_id, "m1");
        assert_eq!(due[1].message_id, "m3");

        // Other tenants see nothing
        assert!(s.query_due("globex", now, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_sent_is_terminal() {
        let s = store();
        let now = Utc::now();
        let e = entry("r1", "t1", "m1", now - Duration::minutes(5));
        s.insert_many(&[e.clone()]).await.unwrap();

        s.mark_sent(&e.id, now).await.unwrap();
        // A late failure report must not overwrite the sent status.
        s.mark_failed(&e.id, "late error").await.unwrap();

        let all = s.query_due("acme", now + Duration::hours(1), 50).await.unwrap();
        assert!(all.is_empty(), "terminal entries are no longer due");

        let conn = s.conn.lock().unwrap();
        let (status, error): (String, Option<String>) = conn
            .query_row(
                "SELECT status, error FROM schedule_entries WHERE id = ?1",
                [&e.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "sent");
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn test_active_hours_snapshot_roundtrip() {
        let s = store();
        let now = Utc::now();
        let mut e = entry("r1", "t1", "m1", now - Duration::minutes(5));
        e.active_hours = Some(ActiveHours { start: "09:00".into(), end: "18:00".into() });
        s.insert_many(&[e]).await.unwrap();

        let due = s.query_due("acme", now, 50).await.unwrap();
        let window = due[0].active_hours.as_ref().unwrap();
        assert_eq!(window.start, "09:00");
        assert_eq!(window.end, "18:00");
    }

    #[tokio::test]
    async fn test_history_append_and_read_back() {
        let s = store();
        let payload = MessagePayload {
            text: "follow-up text".into(),
            document_url: Some("https://files.example.com/brochure.pdf".into()),
            image_url: None,
        };
        s.append("r1", &payload, "follow-up").await.unwrap();

        let rows = s.recent_history("r1", 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, payload);
        assert_eq!(rows[0].1, "follow-up");
    }
}

//! Schedule compiler — walks one template's messages in order and computes
//! each one's absolute fire time for a single recipient.

use chrono::{DateTime, Duration, Utc};

use dripline_core::error::{DriplineError, Result};
use dripline_core::types::{
    DelayAfter, DelayUnit, FollowUpTemplate, Recipient, ScheduleEntry, StartPolicy,
    TemplateMessage,
};

use crate::timing;

/// Fallback when a chained message carries no explicit delay rule.
const DEFAULT_CHAIN_DELAY: DelayAfter = DelayAfter {
    value: 5,
    unit: DelayUnit::Minutes,
    is_instantaneous: false,
};

/// Compile one `(template, recipient)` pair into pending schedule entries.
///
/// Messages are walked in `(day_number, sequence)` order. Each step's base
/// time is either chained from the previous step's final (post-jitter) time
/// or, for scheduled-time messages, anchored to a calendar slot independent
/// of chaining. Batch jitter is added to every step, and the post-jitter
/// value feeds the next step — jitter compounds across the sequence.
///
/// Steps whose computed time has already passed are dropped, never
/// back-filled or sent immediately. A template with zero messages compiles
/// to an empty batch.
pub fn compile_schedule(
    template: &FollowUpTemplate,
    messages: &[TemplateMessage],
    recipient: &Recipient,
    now: DateTime<Utc>,
) -> Result<Vec<ScheduleEntry>> {
    let mut ordered: Vec<&TemplateMessage> = messages.iter().collect();
    ordered.sort_by_key(|m| (m.day_number, m.sequence));

    // Validate the dispatch window up front so the executor can trust the
    // snapshot it gets.
    let active_hours = if template.batch.sleep.enabled {
        let window = &template.batch.sleep.active_hours;
        timing::parse_hhmm(&window.start)?;
        timing::parse_hhmm(&window.end)?;
        Some(window.clone())
    } else {
        None
    };

    let mut entries = Vec::with_capacity(ordered.len());
    let mut previous_fire_at: Option<DateTime<Utc>> = None;

    for message in ordered {
        let mut t = if message.use_scheduled_time {
            let raw = message.scheduled_time.as_deref().ok_or_else(|| {
                DriplineError::config(format!(
                    "message {} uses scheduled time but has none set",
                    message.id
                ))
            })?;
            timing::day_anchor(now, message.day_number, timing::parse_hhmm(raw)?)
        } else if let Some(prev) = previous_fire_at {
            match &message.delay_after {
                // Instantaneous still gets a fixed minimal separation.
                Some(d) if d.is_instantaneous => prev + Duration::minutes(1),
                Some(d) => timing::add_duration(prev, d.value, d.unit),
                None => timing::add_duration(prev, DEFAULT_CHAIN_DELAY.value, DEFAULT_CHAIN_DELAY.unit),
            }
        } else {
            let start = match &template.start_policy {
                StartPolicy::Immediate => now,
                StartPolicy::Delayed24h => now + Duration::hours(24),
                StartPolicy::Custom { start_at } => *start_at,
            };
            match &message.delay_after {
                Some(d) if !d.is_instantaneous => timing::add_duration(start, d.value, d.unit),
                _ => start,
            }
        };

        // Batch jitter applies to every message, scheduled-time ones included.
        t = timing::add_minutes_f64(t, timing::jitter_minutes(&template.batch.message_delay));

        previous_fire_at = Some(t);

        if t > now {
            entries.push(ScheduleEntry::pending(
                &template.tenant_id,
                &recipient.id,
                &template.id,
                &message.id,
                t,
                message.payload(),
                active_hours.clone(),
                now,
            ));
        } else {
            tracing::debug!(
                "⏭ message {} for {} computed in the past, dropped",
                message.id,
                recipient.id
            );
        }
    }

    Ok(entries)
}

//! Template orchestrator — one tenant pass over active templates:
//! match recipients, compile schedules, write them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use dripline_core::error::{DriplineError, Result};
use dripline_core::traits::TemplateStore;
use dripline_core::types::FollowUpTemplate;

use crate::compiler;
use crate::matcher::RecipientMatcher;
use crate::writer::{ScheduleWriter, WriteOutcome};

/// Outcome counts for one tenant compile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub templates: usize,
    /// Templates that failed with a configuration error; the pass continued.
    pub templates_failed: usize,
    pub recipients_matched: usize,
    /// Recipients that received a fresh schedule this pass.
    pub recipients_scheduled: usize,
    /// Recipients skipped by the template-grain idempotency guard.
    pub recipients_skipped: usize,
    pub entries_written: usize,
}

/// Per-tenant single-flight guard. Compile passes for the same tenant must
/// not overlap — the template-grain existence check is only meaningful when
/// one pass runs at a time. Different tenants run fully in parallel.
pub struct TenantGate {
    in_flight: Mutex<HashSet<String>>,
}

impl TenantGate {
    pub fn new() -> Self {
        Self { in_flight: Mutex::new(HashSet::new()) }
    }

    /// Claim a tenant for one pass. Returns `None` while another pass holds
    /// it; the claim releases when the guard drops.
    pub fn acquire(&self, tenant_id: &str) -> Option<TenantGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight.insert(tenant_id.to_string()) {
            Some(TenantGuard { gate: self, tenant_id: tenant_id.to_string() })
        } else {
            None
        }
    }
}

impl Default for TenantGate {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII claim on a tenant, released on drop.
pub struct TenantGuard<'a> {
    gate: &'a TenantGate,
    tenant_id: String,
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.lock().unwrap().remove(&self.tenant_id);
    }
}

/// Ties template access, matching, compilation, and writing together.
pub struct TemplateOrchestrator {
    templates: Arc<dyn TemplateStore>,
    matcher: RecipientMatcher,
    writer: ScheduleWriter,
    gate: TenantGate,
}

impl TemplateOrchestrator {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        matcher: RecipientMatcher,
        writer: ScheduleWriter,
    ) -> Self {
        Self { templates, matcher, writer, gate: TenantGate::new() }
    }

    /// Compile and persist schedules for every active template of a tenant.
    ///
    /// Configuration errors fail their template and the pass continues;
    /// store errors abort the pass (the next periodic invocation retries,
    /// which the idempotency guard makes safe). A pass already in flight
    /// for this tenant yields [`DriplineError::TenantBusy`].
    pub async fn compile_tenant_schedules(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompileReport> {
        let _guard = self
            .gate
            .acquire(tenant_id)
            .ok_or_else(|| DriplineError::TenantBusy(tenant_id.to_string()))?;

        let templates = self.templates.list_active(tenant_id).await?;
        let mut report = CompileReport { templates: templates.len(), ..Default::default() };

        for template in &templates {
            match self.compile_template(template, now, &mut report).await {
                Ok(()) => {}
                Err(DriplineError::Config(msg)) => {
                    report.templates_failed += 1;
                    tracing::warn!("⚠️ template {} failed to compile: {msg}", template.id);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "📅 tenant {tenant_id}: {} template(s), {} recipient(s) scheduled, {} skipped, {} entries written",
            report.templates,
            report.recipients_scheduled,
            report.recipients_skipped,
            report.entries_written
        );
        Ok(report)
    }

    async fn compile_template(
        &self,
        template: &FollowUpTemplate,
        now: DateTime<Utc>,
        report: &mut CompileReport,
    ) -> Result<()> {
        let messages = self.templates.list_messages(&template.id).await?;
        let recipients = self.matcher.match_recipients(template).await?;
        report.recipients_matched += recipients.len();

        let cap = template.batch.contacts_per_batch as usize;
        let mut newly_scheduled = 0usize;

        for recipient in &recipients {
            if cap > 0 && newly_scheduled >= cap {
                tracing::debug!(
                    "template {} hit its per-pass contact cap ({cap}), rest wait for the next pass",
                    template.id
                );
                break;
            }
            let entries = compiler::compile_schedule(template, &messages, recipient, now)?;
            match self
                .writer
                .write_batch(&recipient.id, &template.id, entries)
                .await?
            {
                WriteOutcome::Written(n) if n > 0 => {
                    newly_scheduled += 1;
                    report.recipients_scheduled += 1;
                    report.entries_written += n;
                }
                WriteOutcome::Written(_) => {}
                WriteOutcome::SkippedExisting => report.recipients_skipped += 1,
            }
        }
        Ok(())
    }
}

//! # Dripline Engine
//!
//! The follow-up scheduling engine: compiles sequence templates into
//! per-recipient schedules of absolute fire times, persists them durably,
//! and dispatches due entries.
//!
//! ## Architecture
//! ```text
//! TemplateOrchestrator (per tenant, external trigger)
//!   ├── TemplateStore.list_active
//!   ├── RecipientMatcher: trigger tags ∩ recipient tags (+ keyword seam)
//!   ├── compile_schedule: delay chaining, scheduled-time anchors, jitter
//!   └── ScheduleWriter: template-grain idempotency guard → insert pending
//!
//! DueEntryExecutor (independent cadence, external trigger)
//!   ├── ScheduleStore.query_due (fire_at <= now, bounded page)
//!   ├── active-hours gate → defer
//!   └── DeliveryChannel.send → mark sent/failed + HistoryLog
//! ```
//!
//! The engine owns no timer loop: both entry points run one pass to
//! completion and are meant to be invoked periodically from outside.

pub mod compiler;
pub mod executor;
pub mod matcher;
pub mod orchestrator;
pub mod timing;
pub mod writer;

pub use compiler::compile_schedule;
pub use executor::{DueEntryExecutor, ExecutionReport};
pub use matcher::RecipientMatcher;
pub use orchestrator::{CompileReport, TemplateOrchestrator, TenantGate};
pub use writer::{ScheduleWriter, WriteOutcome};

#[cfg(test)]
mod testutil;

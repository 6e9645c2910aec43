//! Error type shared across all Dripline crates.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DriplineError>;

/// All errors the engine can surface.
///
/// The taxonomy matters to callers: `Config` errors fail a single template
/// and the orchestrator continues; `Store` errors abort the current tenant
/// pass; `Delivery` errors are captured per schedule entry as a terminal
/// failed status and never retried.
#[derive(Debug, thiserror::Error)]
pub enum DriplineError {
    /// Malformed template data: bad delay unit, unparsable scheduled time.
    #[error("config error: {0}")]
    Config(String),

    /// Read/write failure in a backing store.
    #[error("store error: {0}")]
    Store(String),

    /// Outbound delivery failure.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// A compile pass for this tenant is already in flight.
    #[error("tenant busy: {0}")]
    TenantBusy(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriplineError {
    /// Shorthand for a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Shorthand for a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Shorthand for a delivery error.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

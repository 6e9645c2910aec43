//! # Dripline Core
//!
//! Shared foundation for the Dripline follow-up scheduling engine:
//! data model, collaborator traits, error type, and configuration.
//!
//! Everything the engine talks to — template authoring, the recipient
//! directory, the schedule store, the outbound transport, conversation
//! history — sits behind the narrow traits in [`traits`]. The engine itself
//! never assumes a storage product or a wire format.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DriplineConfig;
pub use error::{DriplineError, Result};

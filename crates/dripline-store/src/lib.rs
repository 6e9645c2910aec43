//! # Dripline Store
//!
//! SQLite-backed reference implementation of the store contracts from
//! `dripline-core::traits`. One database file holds templates, recipients,
//! schedule entries, and message history — survives restarts, no external
//! services.
//!
//! Production deployments are free to implement the traits over any
//! queryable record store; the engine never sees past them.

mod sqlite;

pub use sqlite::SqliteStore;

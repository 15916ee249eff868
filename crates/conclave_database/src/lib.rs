//! PostgreSQL schema and connection handling for Conclave.
//!
//! The chat core keeps every piece of authoritative state in the relational
//! store: identities, servers, memberships, roles, invites, channels,
//! messages, reactions, friend edges, blocks, and notification rows. This
//! crate owns the diesel [`schema`], the embedded migrations that create it,
//! and the connection helpers the engine crates build on.
//!
//! Referential integrity notes:
//! - Foreign keys are declared without `ON DELETE CASCADE`; aggregate
//!   deletion paths (server delete, channel delete, ...) remove dependents
//!   explicitly inside their own transaction.
//! - Uniqueness constraints are part of the core contract (one membership
//!   row per (server, user), one DM channel per unordered user pair, one
//!   reaction row per (message, user, emoji), ...) and back up the
//!   check-then-write sequences in the engines.

#![warn(missing_docs)]

mod connection;
#[allow(missing_docs)]
pub mod schema;

pub use connection::{DbPool, create_pool, establish_connection, run_migrations};

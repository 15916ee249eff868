//! Error types for the Conclave chat core.
//!
//! Every fallible core operation returns a [`CoreError`] whose
//! [`CoreErrorKind`] carries the failing entity or precondition. Kinds group
//! into five [`ErrorClass`]es (not-found, forbidden, conflict, invalid
//! argument, unavailable); the boundary layer maps classes to transport
//! status codes, so the distinction between "entity absent" and "actor lacks
//! permission on an existing entity" is preserved all the way out.
//!
//! Connection-level failures live in [`DatabaseError`] and convert into the
//! `Unavailable` class when they surface through a core operation.

#![warn(missing_docs)]

mod core;
mod database;

pub use self::core::{CoreError, CoreErrorKind, CoreResult, ErrorClass};
pub use self::database::{DatabaseError, DatabaseErrorKind, DatabaseResult};

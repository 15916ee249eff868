//! Authorization, membership, and messaging core for the Conclave chat
//! backend.
//!
//! This crate implements the rules that decide, for every mutating or
//! reading operation, whether an actor may perform it, and the invariants
//! that keep role/membership/invite/friend state consistent under concurrent
//! access. The boundary layer (HTTP routing, token authentication) is
//! expected to hand every operation an already-authenticated actor id;
//! there is no implicit "current actor" anywhere in the core.
//!
//! # Engines
//!
//! - [`IdentityStore`]: users and profile fields
//! - [`MembershipEngine`]: servers, membership rows, coarse and custom
//!   roles, channels, permission resolution
//! - [`InviteEngine`]: invite lifecycle from creation through redemption
//! - [`RelationshipEngine`]: friend requests, friendships, blocks
//! - [`MessagingEngine`]: channel/DM messages and reactions
//!
//! All engines share one connection pool; every check-then-write sequence
//! runs in a single transaction against the store, which holds all
//! authoritative state. Operations either fully apply or fully fail.
//! Notifications go through the [`NotificationSink`] after commit,
//! fire-and-forget.
//!
//! # Errors
//!
//! Operations return `conclave_error::CoreResult`; error kinds group into
//! five classes the boundary layer maps to status codes. "Not a member" is a
//! distinct not-found kind, never a silent `false` permission result.

#![warn(missing_docs)]

mod helpers;
mod identity;
mod invites;
mod membership;
mod messaging;
pub mod models;
mod notify;
pub mod permissions;
mod relationships;

pub use identity::{IdentityStore, ProfileUpdate};
pub use invites::{InviteEngine, invite_valid};
pub use membership::{
    CreateServer, MemberUpdate, MembershipEngine, RoleInput, RoleUpdate, ServerUpdate,
};
pub use messaging::{MessageDestination, MessagingEngine, ReactionToggle};
pub use notify::{
    DatabaseNotificationSink, NotificationSink, NotificationStore, NullNotificationSink,
};
pub use permissions::{Permission, PermissionFlags, resolve_permission};
pub use relationships::RelationshipEngine;

//! Core operation error types.

use std::fmt;

/// Transport-facing error classes.
///
/// Every [`CoreErrorKind`] belongs to exactly one class. The boundary layer
/// maps classes to status codes; the core never performs that mapping itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The referenced entity does not exist (includes "not a member").
    NotFound,
    /// The entity exists but the actor may not perform the operation.
    Forbidden,
    /// A state or uniqueness invariant rejects the write.
    Conflict,
    /// Malformed or self-targeting input.
    InvalidArgument,
    /// Transient storage failure; the caller may retry.
    Unavailable,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid argument",
            Self::Unavailable => "unavailable",
        };
        write!(f, "{s}")
    }
}

/// Core error variants.
///
/// Kinds carry the identifier of the failing entity so callers can render
/// precise messages without re-querying.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoreErrorKind {
    /// User not found by ID.
    UserNotFound(i64),
    /// Server not found by ID.
    ServerNotFound(i64),
    /// Channel not found by ID.
    ChannelNotFound(i64),
    /// Direct-message channel not found by ID.
    DmChannelNotFound(i64),
    /// Message not found by ID.
    MessageNotFound(i64),
    /// Role not found by ID.
    RoleNotFound(i64),
    /// No invite matches the given code.
    InviteNotFound(String),
    /// Friend request not found by ID.
    RequestNotFound(i64),
    /// Notification not found by ID.
    NotificationNotFound(i64),
    /// The user holds no membership row for the server.
    ///
    /// Distinct from a false permission result: callers must be able to
    /// tell "not a member" apart from "member but lacks permission".
    NotAMember {
        /// Server the membership was looked up in.
        server_id: i64,
        /// User without a membership row.
        user_id: i64,
    },
    /// No friendship edge exists between the pair.
    NotFriends {
        /// Acting user.
        user_id: i64,
        /// The other user.
        friend_id: i64,
    },
    /// No block edge exists from blocker to blocked.
    BlockNotFound {
        /// Blocking user.
        blocker_id: i64,
        /// Blocked user.
        blocked_id: i64,
    },
    /// Generic record-not-found from the storage layer.
    RecordNotFound,

    /// The actor's effective permission set lacks the named permission.
    MissingPermission(String),
    /// Only the request receiver may respond to a friend request.
    NotRequestReceiver(i64),
    /// The server owner cannot be kicked, demoted, or removed.
    OwnerImmutable(i64),
    /// The actor's coarse role is too junior to act on the target member.
    HierarchyViolation {
        /// Coarse role of the protected target.
        target_role: String,
    },
    /// A block in either direction forbids the operation.
    Blocked {
        /// One side of the blocked pair.
        user_id: i64,
        /// The other side of the blocked pair.
        other_id: i64,
    },
    /// Only the message author may perform this edit.
    NotMessageAuthor(i64),
    /// The server is not public; joining requires an invite.
    PrivateServer(i64),
    /// Opening a new DM channel requires an accepted friendship.
    DmRequiresFriendship {
        /// Acting user.
        user_id: i64,
        /// Intended DM counterpart.
        other_id: i64,
    },
    /// The actor is not one of the DM channel's two participants.
    NotDmParticipant(i64),

    /// The user already holds a membership row for the server.
    AlreadyMember {
        /// Server of the existing membership.
        server_id: i64,
        /// User with the existing membership.
        user_id: i64,
    },
    /// A friendship already exists between the pair.
    AlreadyFriends {
        /// One side of the pair.
        user_id: i64,
        /// The other side of the pair.
        other_id: i64,
    },
    /// A pending friend request already exists between the pair.
    RequestAlreadyPending(i64),
    /// The friend request is in a terminal status and cannot transition.
    RequestNotPending {
        /// Current (terminal) status of the request.
        status: String,
    },
    /// The invite's expiry timestamp has passed.
    InviteExpired(String),
    /// The invite's use counter has reached its limit.
    InviteExhausted(String),
    /// The server's sole default role cannot be deleted.
    DefaultRoleImmutable(i64),
    /// A role with this name already exists on the server.
    RoleNameTaken(String),
    /// A block edge from blocker to blocked already exists.
    AlreadyBlocked {
        /// Blocking user.
        blocker_id: i64,
        /// Blocked user.
        blocked_id: i64,
    },
    /// The username is already taken.
    UsernameTaken(String),
    /// The email address is already registered.
    EmailTaken(String),
    /// Uniqueness constraint rejected the write.
    UniqueViolation(String),

    /// Malformed input (empty content, missing emoji, bad color, ...).
    InvalidArgument(String),
    /// Self-targeting operation (self-friend-request, self-block, self-kick).
    SelfTarget(&'static str),

    /// Transient storage failure.
    Storage(String),
}

impl CoreErrorKind {
    /// The transport-facing class of this kind.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UserNotFound(_)
            | Self::ServerNotFound(_)
            | Self::ChannelNotFound(_)
            | Self::DmChannelNotFound(_)
            | Self::MessageNotFound(_)
            | Self::RoleNotFound(_)
            | Self::InviteNotFound(_)
            | Self::RequestNotFound(_)
            | Self::NotificationNotFound(_)
            | Self::NotAMember { .. }
            | Self::NotFriends { .. }
            | Self::BlockNotFound { .. }
            | Self::RecordNotFound => ErrorClass::NotFound,

            Self::MissingPermission(_)
            | Self::NotRequestReceiver(_)
            | Self::OwnerImmutable(_)
            | Self::HierarchyViolation { .. }
            | Self::Blocked { .. }
            | Self::NotMessageAuthor(_)
            | Self::PrivateServer(_)
            | Self::DmRequiresFriendship { .. }
            | Self::NotDmParticipant(_) => ErrorClass::Forbidden,

            Self::AlreadyMember { .. }
            | Self::AlreadyFriends { .. }
            | Self::RequestAlreadyPending(_)
            | Self::RequestNotPending { .. }
            | Self::InviteExpired(_)
            | Self::InviteExhausted(_)
            | Self::DefaultRoleImmutable(_)
            | Self::RoleNameTaken(_)
            | Self::AlreadyBlocked { .. }
            | Self::UsernameTaken(_)
            | Self::EmailTaken(_)
            | Self::UniqueViolation(_) => ErrorClass::Conflict,

            Self::InvalidArgument(_) | Self::SelfTarget(_) => ErrorClass::InvalidArgument,

            Self::Storage(_) => ErrorClass::Unavailable,
        }
    }
}

impl fmt::Display for CoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound(id) => write!(f, "User not found: {id}"),
            Self::ServerNotFound(id) => write!(f, "Server not found: {id}"),
            Self::ChannelNotFound(id) => write!(f, "Channel not found: {id}"),
            Self::DmChannelNotFound(id) => write!(f, "DM channel not found: {id}"),
            Self::MessageNotFound(id) => write!(f, "Message not found: {id}"),
            Self::RoleNotFound(id) => write!(f, "Role not found: {id}"),
            Self::InviteNotFound(code) => write!(f, "No invite matches code {code:?}"),
            Self::RequestNotFound(id) => write!(f, "Friend request not found: {id}"),
            Self::NotificationNotFound(id) => write!(f, "Notification not found: {id}"),
            Self::NotAMember { server_id, user_id } => {
                write!(f, "User {user_id} is not a member of server {server_id}")
            }
            Self::NotFriends { user_id, friend_id } => {
                write!(f, "Users {user_id} and {friend_id} are not friends")
            }
            Self::BlockNotFound {
                blocker_id,
                blocked_id,
            } => write!(f, "User {blocker_id} has not blocked user {blocked_id}"),
            Self::RecordNotFound => write!(f, "Record not found"),
            Self::MissingPermission(perm) => write!(f, "Missing permission: {perm}"),
            Self::NotRequestReceiver(id) => {
                write!(f, "Only the receiver may respond to friend request {id}")
            }
            Self::OwnerImmutable(id) => {
                write!(f, "The owner of server {id} cannot be removed or demoted")
            }
            Self::HierarchyViolation { target_role } => {
                write!(f, "Cannot act on a member with coarse role {target_role}")
            }
            Self::Blocked { user_id, other_id } => {
                write!(f, "A block between users {user_id} and {other_id} forbids this")
            }
            Self::NotMessageAuthor(id) => {
                write!(f, "Only the author may modify message {id}")
            }
            Self::PrivateServer(id) => {
                write!(f, "Server {id} is private; joining requires an invite")
            }
            Self::DmRequiresFriendship { user_id, other_id } => write!(
                f,
                "Users {user_id} and {other_id} must be friends to open a direct message"
            ),
            Self::NotDmParticipant(id) => {
                write!(f, "Actor is not a participant of DM channel {id}")
            }
            Self::AlreadyMember { server_id, user_id } => {
                write!(f, "User {user_id} is already a member of server {server_id}")
            }
            Self::AlreadyFriends { user_id, other_id } => {
                write!(f, "Users {user_id} and {other_id} are already friends")
            }
            Self::RequestAlreadyPending(id) => {
                write!(f, "A pending friend request already exists: {id}")
            }
            Self::RequestNotPending { status } => {
                write!(f, "Friend request is already {status}")
            }
            Self::InviteExpired(code) => write!(f, "Invite {code:?} has expired"),
            Self::InviteExhausted(code) => {
                write!(f, "Invite {code:?} has reached its use limit")
            }
            Self::DefaultRoleImmutable(id) => {
                write!(f, "Role {id} is the server's default role and cannot be deleted")
            }
            Self::RoleNameTaken(name) => {
                write!(f, "A role named {name:?} already exists on this server")
            }
            Self::AlreadyBlocked {
                blocker_id,
                blocked_id,
            } => write!(f, "User {blocker_id} has already blocked user {blocked_id}"),
            Self::UsernameTaken(name) => write!(f, "Username {name:?} is already taken"),
            Self::EmailTaken(email) => write!(f, "Email {email:?} is already registered"),
            Self::UniqueViolation(what) => write!(f, "Uniqueness violation: {what}"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::SelfTarget(op) => write!(f, "Operation {op} cannot target the actor"),
            Self::Storage(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

/// Core error with source location tracking.
#[derive(Debug, Clone)]
pub struct CoreError {
    /// The kind of error that occurred.
    pub kind: CoreErrorKind,
    /// Line number where the error was created.
    pub line: u32,
    /// File where the error was created.
    pub file: &'static str,
}

impl CoreError {
    /// Create a new `CoreError` with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// The transport-facing class of the underlying kind.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Core Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for CoreError {}

impl From<CoreErrorKind> for CoreError {
    #[track_caller]
    fn from(kind: CoreErrorKind) -> Self {
        CoreError::new(kind)
    }
}

impl From<crate::DatabaseError> for CoreError {
    #[track_caller]
    fn from(err: crate::DatabaseError) -> Self {
        CoreError::new(CoreErrorKind::Storage(err.kind.to_string()))
    }
}

// Diesel error conversions (only available with the database feature)
#[cfg(feature = "database")]
impl From<diesel::result::Error> for CoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind as DieselKind, Error};
        let kind = match err {
            Error::NotFound => CoreErrorKind::RecordNotFound,
            Error::DatabaseError(DieselKind::UniqueViolation, info) => {
                CoreErrorKind::UniqueViolation(info.message().to_string())
            }
            Error::DatabaseError(DieselKind::SerializationFailure, info) => {
                CoreErrorKind::Storage(info.message().to_string())
            }
            Error::DatabaseError(DieselKind::ClosedConnection, info) => {
                CoreErrorKind::Storage(info.message().to_string())
            }
            other => CoreErrorKind::Storage(other.to_string()),
        };
        CoreError::new(kind)
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_partition_the_taxonomy() {
        assert_eq!(CoreErrorKind::UserNotFound(1).class(), ErrorClass::NotFound);
        assert_eq!(
            CoreErrorKind::NotAMember {
                server_id: 1,
                user_id: 2
            }
            .class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            CoreErrorKind::MissingPermission("kick_members".into()).class(),
            ErrorClass::Forbidden
        );
        assert_eq!(
            CoreErrorKind::InviteExhausted("ABC123".into()).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            CoreErrorKind::SelfTarget("block_user").class(),
            ErrorClass::InvalidArgument
        );
        assert_eq!(
            CoreErrorKind::Storage("connection reset".into()).class(),
            ErrorClass::Unavailable
        );
    }

    #[test]
    fn not_a_member_is_distinct_from_forbidden() {
        let absent = CoreError::new(CoreErrorKind::NotAMember {
            server_id: 7,
            user_id: 9,
        });
        let denied = CoreError::new(CoreErrorKind::MissingPermission("manage_roles".into()));
        assert_ne!(absent.class(), denied.class());
    }

    #[test]
    fn display_includes_location() {
        let err = CoreError::new(CoreErrorKind::RecordNotFound);
        let rendered = format!("{err}");
        assert!(rendered.contains("Record not found"));
        assert!(rendered.contains("core.rs"));
    }
}

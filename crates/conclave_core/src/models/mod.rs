//! Diesel models for the chat core tables.
//!
//! Each table gets a `Queryable` row struct and an `Insertable` `New*`
//! struct. Row structs expose their id and foreign-key columns directly and
//! the remaining attributes through getters. Enumerated columns (coarse
//! role, request status, notification type) are stored as text and mapped to
//! typed enums here.

mod channel;
mod invite;
mod member;
mod message;
mod notification;
mod relationship;
mod role;
mod server;
mod user;

pub use channel::{ChannelRow, DmChannelRow, NewChannel, NewDmChannel};
pub use invite::{InviteRow, NewInvite};
pub use member::{CoarseRole, MemberRole, NewServerMember, ServerMemberRow};
pub use message::{MessageRow, NewMessage, NewReaction, ReactionRow};
pub use notification::{
    NewNotification, NewNotificationBuilder, NotificationRow, NotificationType,
};
pub use relationship::{
    BlockedUserRow, FriendRequestRow, FriendRow, NewBlockedUser, NewFriend, NewFriendRequest,
    RequestStatus,
};
pub use role::{NewRole, NewRoleBuilder, RoleRow};
pub use server::{NewServer, NewServerBuilder, ServerRow};
pub use user::{NewUser, UserRow};

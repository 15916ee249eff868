//! Message and reaction models.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the messages table.
///
/// A message belongs to exactly one of {channel, dm_channel} (a CHECK
/// constraint backs this up). Messages are append-only and ordered by
/// `created_at`; edits set `is_edited`/`edited_at` but never reorder.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(super::channel::ChannelRow, foreign_key = channel_id))]
#[diesel(belongs_to(super::channel::DmChannelRow, foreign_key = dm_channel_id))]
#[diesel(table_name = conclave_database::schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Message ID
    pub id: i64,
    /// Parent channel ID, for server-channel messages
    pub channel_id: Option<i64>,
    /// Parent DM channel ID, for direct messages
    pub dm_channel_id: Option<i64>,
    /// Authoring user ID
    pub author_id: i64,
    content: String,
    is_edited: bool,
    edited_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

/// Insertable struct for the messages table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::messages)]
pub struct NewMessage {
    pub(crate) channel_id: Option<i64>,
    pub(crate) dm_channel_id: Option<i64>,
    pub(crate) author_id: i64,
    pub(crate) content: String,
}

/// Database row for the message_reactions table.
///
/// Unique per (message, user, emoji); the toggle operation relies on that
/// constraint to stay idempotent under races.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(MessageRow, foreign_key = message_id))]
#[diesel(table_name = conclave_database::schema::message_reactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReactionRow {
    /// Reaction ID
    pub id: i64,
    /// Message ID
    pub message_id: i64,
    /// Reacting user ID
    pub user_id: i64,
    emoji: String,
    created_at: NaiveDateTime,
}

/// Insertable struct for the message_reactions table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::message_reactions)]
pub struct NewReaction {
    pub(crate) message_id: i64,
    pub(crate) user_id: i64,
    pub(crate) emoji: String,
}

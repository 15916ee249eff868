//! Messaging core.
//!
//! Channel and direct messages, reactions, and the notification triggers
//! tied to them. Channel posting is gated on server membership only (no
//! per-channel permission overrides exist). DM posting is gated on
//! participation; *creating* a DM channel additionally requires an accepted
//! friendship, checked once at creation and never re-checked afterwards.

use crate::helpers::{find_server, get_conn, require_membership, require_permission, user_exists};
use crate::membership::find_channel;
use crate::models::{
    DmChannelRow, MessageRow, NewDmChannel, NewMessage, NewNotificationBuilder, NewReaction,
    NotificationType, ReactionRow,
};
use crate::notify::NotificationSink;
use crate::permissions::Permission;
use crate::relationships::friendship_exists;
use conclave_database::DbPool;
use conclave_database::schema::{dm_channels, message_reactions, messages, notifications};
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::instrument;

/// Where a message is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDestination {
    /// A server channel, by channel id.
    Channel(i64),
    /// A direct message to another user. The DM channel is created lazily
    /// on first use.
    Direct(i64),
}

/// Outcome of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionToggle {
    /// The reaction row was created.
    Added,
    /// The existing reaction row was removed.
    Removed,
}

/// Store the lower user id first so each unordered pair has one canonical
/// row.
pub(crate) fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a < b { (a, b) } else { (b, a) }
}

/// Message and reaction operations.
#[derive(Clone)]
pub struct MessagingEngine {
    pool: DbPool,
    sink: Arc<dyn NotificationSink>,
}

impl MessagingEngine {
    /// Create the engine over a pool and a notification sink.
    pub fn new(pool: DbPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Post a message.
    ///
    /// Channel destinations require server membership. Direct destinations
    /// post into the pair's DM channel, creating it first if the two users
    /// are friends; posting into an existing DM channel does not re-check
    /// friendship. DMs notify the other party.
    #[instrument(skip(self, content))]
    pub async fn post_message(
        &self,
        actor_id: i64,
        destination: MessageDestination,
        content: &str,
    ) -> CoreResult<MessageRow> {
        if content.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "message content must not be empty".to_string(),
            )));
        }
        match destination {
            MessageDestination::Channel(channel_id) => {
                self.post_channel_message(actor_id, channel_id, content).await
            }
            MessageDestination::Direct(other_id) => {
                self.post_direct_message(actor_id, other_id, content).await
            }
        }
    }

    async fn post_channel_message(
        &self,
        actor_id: i64,
        channel_id: i64,
        content: &str,
    ) -> CoreResult<MessageRow> {
        let mut conn = get_conn(&self.pool)?;
        let row = conn.transaction::<MessageRow, CoreError, _>(|conn| {
            let channel = find_channel(conn, channel_id)?;
            require_membership(conn, channel.server_id, actor_id)?;
            let row = diesel::insert_into(messages::table)
                .values(&NewMessage {
                    channel_id: Some(channel_id),
                    dm_channel_id: None,
                    author_id: actor_id,
                    content: content.to_string(),
                })
                .returning(MessageRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;
        tracing::debug!(message_id = row.id, channel_id, "Channel message posted");
        Ok(row)
    }

    async fn post_direct_message(
        &self,
        actor_id: i64,
        other_id: i64,
        content: &str,
    ) -> CoreResult<MessageRow> {
        if actor_id == other_id {
            return Err(CoreError::new(CoreErrorKind::SelfTarget("post_message")));
        }
        let mut conn = get_conn(&self.pool)?;
        let row = conn.transaction::<MessageRow, CoreError, _>(|conn| {
            let channel = ensure_dm_channel(conn, actor_id, other_id)?;
            let row: MessageRow = diesel::insert_into(messages::table)
                .values(&NewMessage {
                    channel_id: None,
                    dm_channel_id: Some(channel.id),
                    author_id: actor_id,
                    content: content.to_string(),
                })
                .returning(MessageRow::as_returning())
                .get_result(conn)?;
            diesel::update(dm_channels::table.find(channel.id))
                .set(dm_channels::last_message_at.eq(row.created_at()))
                .execute(conn)?;
            Ok(row)
        })?;
        tracing::debug!(message_id = row.id, "Direct message posted");

        let snippet: String = content.chars().take(100).collect();
        let notification = NewNotificationBuilder::default()
            .user_id(other_id)
            .notification_type(NotificationType::Message)
            .title("New direct message")
            .content(snippet)
            .message_id(Some(row.id))
            .build();
        if let Ok(n) = notification {
            self.sink.enqueue(n).await;
        }
        Ok(row)
    }

    /// Open (or return the existing) DM channel with another user.
    ///
    /// Creation requires an accepted friendship; an existing channel is
    /// returned regardless of the current friendship state.
    #[instrument(skip(self))]
    pub async fn open_dm(&self, actor_id: i64, other_id: i64) -> CoreResult<DmChannelRow> {
        if actor_id == other_id {
            return Err(CoreError::new(CoreErrorKind::SelfTarget("open_dm")));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<DmChannelRow, CoreError, _>(|conn| {
            ensure_dm_channel(conn, actor_id, other_id)
        })
    }

    /// Edit a message's content. Author only; edits never reorder.
    #[instrument(skip(self, content))]
    pub async fn edit_message(
        &self,
        actor_id: i64,
        message_id: i64,
        content: &str,
    ) -> CoreResult<MessageRow> {
        if content.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "message content must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<MessageRow, CoreError, _>(|conn| {
            let message = find_message(conn, message_id)?;
            if message.author_id != actor_id {
                return Err(CoreError::new(CoreErrorKind::NotMessageAuthor(message_id)));
            }
            let row = diesel::update(messages::table.find(message_id))
                .set((
                    messages::content.eq(content),
                    messages::is_edited.eq(true),
                    messages::edited_at.eq(diesel::dsl::now.nullable()),
                ))
                .returning(MessageRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })
    }

    /// Delete a message.
    ///
    /// The author may always delete their own message. For channel
    /// messages, `manage_messages` on the channel's server also suffices;
    /// DM messages are author-only.
    #[instrument(skip(self))]
    pub async fn delete_message(&self, actor_id: i64, message_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let message = find_message(conn, message_id)?;
            if message.author_id != actor_id {
                match message.channel_id {
                    Some(channel_id) => {
                        let channel = find_channel(conn, channel_id)?;
                        let server = find_server(conn, channel.server_id)?;
                        require_permission(conn, &server, actor_id, Permission::ManageMessages)?;
                    }
                    None => {
                        return Err(CoreError::new(CoreErrorKind::NotMessageAuthor(message_id)));
                    }
                }
            }
            diesel::delete(
                message_reactions::table.filter(message_reactions::message_id.eq(message_id)),
            )
            .execute(conn)?;
            diesel::delete(notifications::table.filter(notifications::message_id.eq(message_id)))
                .execute(conn)?;
            diesel::delete(messages::table.find(message_id)).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(message_id, actor_id, "Message deleted");
        Ok(())
    }

    /// Toggle a reaction: add it if absent, remove it if present.
    ///
    /// The unique (message, user, emoji) constraint makes concurrent
    /// double-toggles resolve to a deterministic single row.
    #[instrument(skip(self))]
    pub async fn toggle_reaction(
        &self,
        actor_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> CoreResult<ReactionToggle> {
        if emoji.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "emoji must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        let outcome = conn.transaction::<ReactionToggle, CoreError, _>(|conn| {
            let message = find_message(conn, message_id)?;
            check_message_visibility(conn, &message, actor_id)?;

            let inserted = diesel::insert_into(message_reactions::table)
                .values(&NewReaction {
                    message_id,
                    user_id: actor_id,
                    emoji: emoji.to_string(),
                })
                .on_conflict_do_nothing()
                .execute(conn)?;
            if inserted == 1 {
                return Ok(ReactionToggle::Added);
            }
            diesel::delete(
                message_reactions::table
                    .filter(message_reactions::message_id.eq(message_id))
                    .filter(message_reactions::user_id.eq(actor_id))
                    .filter(message_reactions::emoji.eq(emoji)),
            )
            .execute(conn)?;
            Ok(ReactionToggle::Removed)
        })?;
        tracing::debug!(message_id, actor_id, emoji, ?outcome, "Reaction toggled");
        Ok(outcome)
    }

    /// The reactions on a message, oldest first. Gated like reading the
    /// message itself.
    #[instrument(skip(self))]
    pub async fn reactions(
        &self,
        actor_id: i64,
        message_id: i64,
    ) -> CoreResult<Vec<ReactionRow>> {
        let mut conn = get_conn(&self.pool)?;
        let message = find_message(&mut conn, message_id)?;
        check_message_visibility(&mut conn, &message, actor_id)?;
        let rows = message_reactions::table
            .filter(message_reactions::message_id.eq(message_id))
            .order(message_reactions::created_at.asc())
            .select(ReactionRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// The most recent messages of a channel, oldest first. Requires
    /// membership of the channel's server.
    #[instrument(skip(self))]
    pub async fn channel_messages(
        &self,
        actor_id: i64,
        channel_id: i64,
        limit: i64,
    ) -> CoreResult<Vec<MessageRow>> {
        let mut conn = get_conn(&self.pool)?;
        let channel = find_channel(&mut conn, channel_id)?;
        require_membership(&mut conn, channel.server_id, actor_id)?;
        let mut rows: Vec<MessageRow> = messages::table
            .filter(messages::channel_id.eq(channel_id))
            .order(messages::created_at.desc())
            .limit(limit)
            .select(MessageRow::as_select())
            .load(&mut conn)?;
        rows.reverse();
        Ok(rows)
    }

    /// The most recent messages of a DM channel, oldest first. Participants
    /// only.
    #[instrument(skip(self))]
    pub async fn dm_messages(
        &self,
        actor_id: i64,
        dm_channel_id: i64,
        limit: i64,
    ) -> CoreResult<Vec<MessageRow>> {
        let mut conn = get_conn(&self.pool)?;
        let channel = find_dm_channel(&mut conn, dm_channel_id)?;
        if !channel.includes(actor_id) {
            return Err(CoreError::new(CoreErrorKind::NotDmParticipant(dm_channel_id)));
        }
        let mut rows: Vec<MessageRow> = messages::table
            .filter(messages::dm_channel_id.eq(dm_channel_id))
            .order(messages::created_at.desc())
            .limit(limit)
            .select(MessageRow::as_select())
            .load(&mut conn)?;
        rows.reverse();
        Ok(rows)
    }
}

/// Find the pair's DM channel or create it, gating creation on friendship.
fn ensure_dm_channel(
    conn: &mut PgConnection,
    actor_id: i64,
    other_id: i64,
) -> CoreResult<DmChannelRow> {
    let (lo, hi) = canonical_pair(actor_id, other_id);
    let existing = dm_channels::table
        .filter(dm_channels::user_a.eq(lo))
        .filter(dm_channels::user_b.eq(hi))
        .select(DmChannelRow::as_select())
        .first(conn)
        .optional()?;
    if let Some(channel) = existing {
        return Ok(channel);
    }

    if !user_exists(conn, other_id)? {
        return Err(CoreError::new(CoreErrorKind::UserNotFound(other_id)));
    }
    if !friendship_exists(conn, actor_id, other_id)? {
        return Err(CoreError::new(CoreErrorKind::DmRequiresFriendship {
            user_id: actor_id,
            other_id,
        }));
    }
    let created = diesel::insert_into(dm_channels::table)
        .values(&NewDmChannel {
            user_a: lo,
            user_b: hi,
        })
        .on_conflict_do_nothing()
        .returning(DmChannelRow::as_returning())
        .get_result(conn)
        .optional()?;
    match created {
        Some(channel) => Ok(channel),
        // A concurrent open won the insert; use its row.
        None => {
            let row = dm_channels::table
                .filter(dm_channels::user_a.eq(lo))
                .filter(dm_channels::user_b.eq(hi))
                .select(DmChannelRow::as_select())
                .first(conn)?;
            Ok(row)
        }
    }
}

fn find_message(conn: &mut PgConnection, message_id: i64) -> CoreResult<MessageRow> {
    messages::table
        .find(message_id)
        .select(MessageRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::MessageNotFound(message_id)))
}

fn find_dm_channel(conn: &mut PgConnection, dm_channel_id: i64) -> CoreResult<DmChannelRow> {
    dm_channels::table
        .find(dm_channel_id)
        .select(DmChannelRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::DmChannelNotFound(dm_channel_id)))
}

/// Actors may react only to messages they can read: channel messages need
/// server membership, DM messages need participation.
fn check_message_visibility(
    conn: &mut PgConnection,
    message: &MessageRow,
    actor_id: i64,
) -> CoreResult<()> {
    if let Some(channel_id) = message.channel_id {
        let channel = find_channel(conn, channel_id)?;
        require_membership(conn, channel.server_id, actor_id)?;
        return Ok(());
    }
    if let Some(dm_channel_id) = message.dm_channel_id {
        let channel = find_dm_channel(conn, dm_channel_id)?;
        if !channel.includes(actor_id) {
            return Err(CoreError::new(CoreErrorKind::NotDmParticipant(dm_channel_id)));
        }
        return Ok(());
    }
    // The CHECK constraint makes this unreachable.
    Err(CoreError::new(CoreErrorKind::MessageNotFound(message.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_lower_id_first() {
        assert_eq!(canonical_pair(2, 9), (2, 9));
        assert_eq!(canonical_pair(9, 2), (2, 9));
    }
}

//! Channel models: server channels and direct-message channels.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the channels table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(super::server::ServerRow, foreign_key = server_id))]
#[diesel(table_name = conclave_database::schema::channels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChannelRow {
    /// Channel ID
    pub id: i64,
    /// Server ID
    pub server_id: i64,
    name: String,
    channel_type: String,
    created_at: NaiveDateTime,
}

/// Insertable struct for the channels table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::channels)]
pub struct NewChannel {
    pub(crate) server_id: i64,
    pub(crate) name: String,
    pub(crate) channel_type: String,
}

/// Database row for the dm_channels table.
///
/// One channel per unordered user pair; `user_a` always holds the lower user
/// id. A DM channel, once created, stays usable even if the friendship that
/// gated its creation is later revoked.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::dm_channels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DmChannelRow {
    /// DM channel ID
    pub id: i64,
    /// Lower user ID of the pair
    pub user_a: i64,
    /// Higher user ID of the pair
    pub user_b: i64,
    created_at: NaiveDateTime,
    last_message_at: Option<NaiveDateTime>,
}

impl DmChannelRow {
    /// Whether `user_id` is one of the two participants.
    pub fn includes(&self, user_id: i64) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// The participant other than `user_id`.
    pub fn other_party(&self, user_id: i64) -> i64 {
        if self.user_a == user_id {
            self.user_b
        } else {
            self.user_a
        }
    }
}

/// Insertable struct for the dm_channels table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::dm_channels)]
pub struct NewDmChannel {
    pub(crate) user_a: i64,
    pub(crate) user_b: i64,
}

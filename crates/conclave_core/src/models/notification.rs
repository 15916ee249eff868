//! Notification models.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::fmt;

/// Notification category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    diesel::deserialize::FromSqlRow,
    diesel::expression::AsExpression,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// New direct message.
    Message,
    /// The user was mentioned.
    Mention,
    /// Incoming or answered friend request.
    FriendRequest,
    /// Server invite activity.
    ServerInvite,
    /// Server-level event (kick, role change, ...).
    ServerEvent,
}

impl NotificationType {
    /// Stable text form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Message => "message",
            NotificationType::Mention => "mention",
            NotificationType::FriendRequest => "friend_request",
            NotificationType::ServerInvite => "server_invite",
            NotificationType::ServerEvent => "server_event",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg> for NotificationType {
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
    ) -> diesel::serialize::Result {
        use std::io::Write;
        out.write_all(self.as_str().as_bytes())?;
        Ok(diesel::serialize::IsNull::No)
    }
}

impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg> for NotificationType {
    fn from_sql(bytes: diesel::pg::PgValue) -> diesel::deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"message" => Ok(NotificationType::Message),
            b"mention" => Ok(NotificationType::Mention),
            b"friend_request" => Ok(NotificationType::FriendRequest),
            b"server_invite" => Ok(NotificationType::ServerInvite),
            b"server_event" => Ok(NotificationType::ServerEvent),
            _ => Err("Unrecognized notification type".into()),
        }
    }
}

/// Database row for the notifications table.
///
/// The durable form behind the notification sink. Reference columns are
/// optional and depend on the notification type.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    /// Notification ID
    pub id: i64,
    /// Recipient user ID
    pub user_id: i64,
    notification_type: NotificationType,
    title: String,
    content: String,
    friend_request_id: Option<i64>,
    message_id: Option<i64>,
    server_id: Option<i64>,
    channel_id: Option<i64>,
    is_read: bool,
    created_at: NaiveDateTime,
}

/// Insertable struct for the notifications table.
#[derive(Debug, Clone, Insertable, derive_builder::Builder)]
#[diesel(table_name = conclave_database::schema::notifications)]
#[builder(setter(into))]
pub struct NewNotification {
    pub(crate) user_id: i64,
    pub(crate) notification_type: NotificationType,
    pub(crate) title: String,
    pub(crate) content: String,
    #[builder(default)]
    pub(crate) friend_request_id: Option<i64>,
    #[builder(default)]
    pub(crate) message_id: Option<i64>,
    #[builder(default)]
    pub(crate) server_id: Option<i64>,
    #[builder(default)]
    pub(crate) channel_id: Option<i64>,
}

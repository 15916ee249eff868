//! Friend request, friendship, and block models.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::fmt;

/// Friend request status.
///
/// `Pending` is the only state that permits transitions; `Accepted` and
/// `Rejected` are terminal.
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
pub enum RequestStatus {
    /// Awaiting a response from the receiver.
    Pending,
    /// Accepted; the symmetric friend edges exist.
    Accepted,
    /// Rejected; no further transitions.
    Rejected,
}

impl RequestStatus {
    /// Stable text form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Whether no further transitions are allowed from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg> for RequestStatus {
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
    ) -> diesel::serialize::Result {
        use std::io::Write;
        out.write_all(self.as_str().as_bytes())?;
        Ok(diesel::serialize::IsNull::No)
    }
}

impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg> for RequestStatus {
    fn from_sql(bytes: diesel::pg::PgValue) -> diesel::deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(RequestStatus::Pending),
            b"accepted" => Ok(RequestStatus::Accepted),
            b"rejected" => Ok(RequestStatus::Rejected),
            _ => Err("Unrecognized request status".into()),
        }
    }
}

/// Database row for the friend_requests table.
///
/// Unique per ordered (sender, receiver) pair.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::friend_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendRequestRow {
    /// Request ID
    pub id: i64,
    /// Sending user ID
    pub sender_id: i64,
    /// Receiving user ID
    pub receiver_id: i64,
    status: RequestStatus,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable struct for the friend_requests table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::friend_requests)]
pub struct NewFriendRequest {
    pub(crate) sender_id: i64,
    pub(crate) receiver_id: i64,
}

/// Database row for the friends table.
///
/// A friendship is two directed edges created atomically together; if the
/// (A, B) row exists then the (B, A) row exists too.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::friends)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendRow {
    /// Edge ID
    pub id: i64,
    /// Owning user of this edge
    pub user_id: i64,
    /// Befriended user
    pub friend_id: i64,
    created_at: NaiveDateTime,
}

/// Insertable struct for the friends table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::friends)]
pub struct NewFriend {
    pub(crate) user_id: i64,
    pub(crate) friend_id: i64,
}

/// Database row for the blocked_users table.
///
/// Blocks are directed and independent per direction; a block in either
/// direction forbids new friend requests between the pair.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::blocked_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockedUserRow {
    /// Block ID
    pub id: i64,
    /// Blocking user
    pub blocker_id: i64,
    /// Blocked user
    pub blocked_id: i64,
    created_at: NaiveDateTime,
}

/// Insertable struct for the blocked_users table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conclave_database::schema::blocked_users)]
pub struct NewBlockedUser {
    pub(crate) blocker_id: i64,
    pub(crate) blocked_id: i64,
}

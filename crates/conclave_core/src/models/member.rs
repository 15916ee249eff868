//! Server membership models.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::fmt;

/// Legacy coarse role tag layered under the custom-role permission system.
///
/// Maps to the text `role` column of server_members.
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
pub enum CoarseRole {
    /// The server owner; passes every permission check.
    Owner,
    /// Grants everything except manage_server.
    Admin,
    /// Grants manage_messages, kick_members, create_invites.
    Moderator,
    /// Baseline membership; grants create_invites only.
    Member,
}

impl CoarseRole {
    /// Stable text form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoarseRole::Owner => "owner",
            CoarseRole::Admin => "admin",
            CoarseRole::Moderator => "moderator",
            CoarseRole::Member => "member",
        }
    }

    /// Owner and admin members may act on protected members.
    pub fn is_privileged(&self) -> bool {
        matches!(self, CoarseRole::Owner | CoarseRole::Admin)
    }

    /// Admin and moderator members may only be removed by privileged actors.
    pub fn is_protected(&self) -> bool {
        matches!(self, CoarseRole::Admin | CoarseRole::Moderator)
    }
}

impl fmt::Display for CoarseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg> for CoarseRole {
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
    ) -> diesel::serialize::Result {
        use std::io::Write;
        out.write_all(self.as_str().as_bytes())?;
        Ok(diesel::serialize::IsNull::No)
    }
}

impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg> for CoarseRole {
    fn from_sql(bytes: diesel::pg::PgValue) -> diesel::deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"owner" => Ok(CoarseRole::Owner),
            b"admin" => Ok(CoarseRole::Admin),
            b"moderator" => Ok(CoarseRole::Moderator),
            b"member" => Ok(CoarseRole::Member),
            _ => Err("Unrecognized coarse role".into()),
        }
    }
}

/// Database row for the server_members table.
///
/// One row per (server, user) pair; created on join, destroyed on
/// leave/kick. The owner's row always carries the `owner` coarse role.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(super::server::ServerRow, foreign_key = server_id))]
#[diesel(belongs_to(super::user::UserRow, foreign_key = user_id))]
#[diesel(table_name = conclave_database::schema::server_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServerMemberRow {
    /// Membership ID
    pub id: i64,
    /// Server ID
    pub server_id: i64,
    /// User ID
    pub user_id: i64,
    nickname: Option<String>,
    role: CoarseRole,
    joined_at: NaiveDateTime,
}

/// Insertable struct for the server_members table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::server_members)]
pub struct NewServerMember {
    pub(crate) server_id: i64,
    pub(crate) user_id: i64,
    pub(crate) nickname: Option<String>,
    pub(crate) role: CoarseRole,
}

/// Assignment row linking a membership to a custom role.
#[derive(Debug, Clone, Queryable, Identifiable, Insertable, Associations)]
#[diesel(belongs_to(ServerMemberRow, foreign_key = member_id))]
#[diesel(belongs_to(super::role::RoleRow, foreign_key = role_id))]
#[diesel(table_name = conclave_database::schema::member_roles)]
#[diesel(primary_key(member_id, role_id))]
pub struct MemberRole {
    /// Membership ID
    pub member_id: i64,
    /// Custom role ID
    pub role_id: i64,
}

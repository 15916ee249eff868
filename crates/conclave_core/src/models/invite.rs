//! Server invite models.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the server_invites table.
///
/// An invite has no explicit status: validity is computed from `expires_at`
/// and the `uses`/`max_uses` pair (`max_uses` 0 = unlimited). Redemption is
/// the only mutator of `uses`.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(super::server::ServerRow, foreign_key = server_id))]
#[diesel(table_name = conclave_database::schema::server_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InviteRow {
    /// Invite ID
    pub id: i64,
    /// Server ID
    pub server_id: i64,
    code: String,
    /// Creating user ID
    pub created_by: i64,
    max_uses: i32,
    uses: i32,
    expires_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl InviteRow {
    /// Whether the invite can still be redeemed at `now`.
    pub fn is_valid(&self, now: NaiveDateTime) -> bool {
        crate::invites::invite_valid(self.expires_at, self.max_uses, self.uses, now)
    }
}

/// Insertable struct for the server_invites table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::server_invites)]
pub struct NewInvite {
    pub(crate) server_id: i64,
    pub(crate) code: String,
    pub(crate) created_by: i64,
    pub(crate) max_uses: i32,
    pub(crate) expires_at: Option<NaiveDateTime>,
}

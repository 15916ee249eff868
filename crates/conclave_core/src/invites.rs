//! Invite engine.
//!
//! An invite carries no status column: validity is computed from expiry and
//! the use counter. Redemption is the only mutator of `uses`, implemented as
//! a guarded compare-and-increment so concurrent redemptions of the same
//! invite serialize on the row and can never push `uses` past `max_uses`.

use crate::helpers::{find_server, get_conn, require_permission, user_exists};
use crate::membership::insert_membership;
use crate::models::{InviteRow, NewInvite, ServerMemberRow};
use crate::permissions::Permission;
use chrono::NaiveDateTime;
use conclave_database::DbPool;
use conclave_database::schema::server_invites;
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::prelude::*;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::instrument;

const CODE_LENGTH: usize = 8;
const CODE_ATTEMPTS: usize = 5;

/// Whether an invite with these attributes can be redeemed at `now`.
///
/// `max_uses` 0 means unlimited.
pub fn invite_valid(
    expires_at: Option<NaiveDateTime>,
    max_uses: i32,
    uses: i32,
    now: NaiveDateTime,
) -> bool {
    if let Some(expiry) = expires_at {
        if now > expiry {
            return false;
        }
    }
    if max_uses > 0 && uses >= max_uses {
        return false;
    }
    true
}

fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Invite lifecycle operations.
#[derive(Debug, Clone)]
pub struct InviteEngine {
    pool: DbPool,
}

impl InviteEngine {
    /// Create the engine over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an invite for a server. Requires `create_invites` (granted to
    /// every member by baseline).
    ///
    /// The code is generated unique across all invites; a collision is
    /// retried, never surfaced to the caller.
    #[instrument(skip(self))]
    pub async fn create_invite(
        &self,
        actor_id: i64,
        server_id: i64,
        max_uses: i32,
        expires_at: Option<NaiveDateTime>,
    ) -> CoreResult<InviteRow> {
        if max_uses < 0 {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "max_uses must be non-negative".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_code();
            let attempt = conn.transaction::<InviteRow, CoreError, _>(|conn| {
                let server = find_server(conn, server_id)?;
                require_permission(conn, &server, actor_id, Permission::CreateInvites)?;
                let row = diesel::insert_into(server_invites::table)
                    .values(&NewInvite {
                        server_id,
                        code: code.clone(),
                        created_by: actor_id,
                        max_uses,
                        expires_at,
                    })
                    .returning(InviteRow::as_returning())
                    .get_result(conn)?;
                Ok(row)
            });
            match attempt {
                Err(e) if matches!(e.kind, CoreErrorKind::UniqueViolation(_)) => {
                    tracing::debug!(code = %code, "Invite code collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
                Ok(row) => {
                    tracing::info!(invite_id = row.id, server_id, "Invite created");
                    return Ok(row);
                }
            }
        }
        Err(CoreError::new(CoreErrorKind::Storage(
            "could not allocate a unique invite code".to_string(),
        )))
    }

    /// Look up an invite by code.
    #[instrument(skip(self))]
    pub async fn get_invite(&self, code: &str) -> CoreResult<InviteRow> {
        let mut conn = get_conn(&self.pool)?;
        find_invite(&mut conn, code)
    }

    /// Redeem an invite, joining its server.
    ///
    /// Fails with `InviteNotFound` for an unknown code, `InviteExpired` /
    /// `InviteExhausted` for a dead one, and `AlreadyMember` if the user
    /// already holds a membership row. The membership insert and the use
    /// increment commit atomically; the increment is guarded so concurrent
    /// redemptions of a limited invite succeed exactly `max_uses` times.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str, user_id: i64) -> CoreResult<ServerMemberRow> {
        let mut conn = get_conn(&self.pool)?;
        let membership = conn.transaction::<ServerMemberRow, CoreError, _>(|conn| {
            let invite = find_invite(conn, code)?;
            if !user_exists(conn, user_id)? {
                return Err(CoreError::new(CoreErrorKind::UserNotFound(user_id)));
            }
            let now = chrono::Utc::now().naive_utc();
            if !invite.is_valid(now) {
                return Err(CoreError::new(invalid_kind(&invite, now)));
            }

            // Compare-and-increment: re-checks validity under the row lock,
            // so a concurrent redemption that commits first is observed.
            let incremented = diesel::update(
                server_invites::table
                    .find(invite.id)
                    .filter(
                        server_invites::max_uses
                            .eq(0)
                            .or(server_invites::uses.lt(server_invites::max_uses)),
                    )
                    .filter(
                        server_invites::expires_at
                            .is_null()
                            .or(server_invites::expires_at.gt(diesel::dsl::now.nullable())),
                    ),
            )
            .set(server_invites::uses.eq(server_invites::uses + 1))
            .execute(conn)?;
            if incremented == 0 {
                let current = find_invite(conn, code)?;
                return Err(CoreError::new(invalid_kind(&current, now)));
            }

            insert_membership(conn, invite.server_id, user_id)
        })?;
        tracing::info!(server_id = membership.server_id, user_id, "Invite redeemed");
        Ok(membership)
    }

    /// List a server's invites. Requires `manage_server`.
    #[instrument(skip(self))]
    pub async fn list_invites(&self, actor_id: i64, server_id: i64) -> CoreResult<Vec<InviteRow>> {
        let mut conn = get_conn(&self.pool)?;
        let server = find_server(&mut conn, server_id)?;
        require_permission(&mut conn, &server, actor_id, Permission::ManageServer)?;
        let rows = server_invites::table
            .filter(server_invites::server_id.eq(server_id))
            .order(server_invites::created_at.desc())
            .select(InviteRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Revoke an invite. Allowed for its creator, or with `manage_server`.
    #[instrument(skip(self))]
    pub async fn revoke_invite(&self, actor_id: i64, code: &str) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let invite = find_invite(conn, code)?;
            if invite.created_by != actor_id {
                let server = find_server(conn, invite.server_id)?;
                require_permission(conn, &server, actor_id, Permission::ManageServer)?;
            }
            diesel::delete(server_invites::table.find(invite.id)).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(code, "Invite revoked");
        Ok(())
    }
}

fn find_invite(conn: &mut diesel::pg::PgConnection, code: &str) -> CoreResult<InviteRow> {
    server_invites::table
        .filter(server_invites::code.eq(code))
        .select(InviteRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::InviteNotFound(code.to_string())))
}

/// Classify an invalid invite into the precise conflict kind.
fn invalid_kind(invite: &InviteRow, now: NaiveDateTime) -> CoreErrorKind {
    if let Some(expiry) = invite.expires_at() {
        if now > *expiry {
            return CoreErrorKind::InviteExpired(invite.code().clone());
        }
    }
    CoreErrorKind::InviteExhausted(invite.code().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn t0() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    #[test]
    fn unlimited_invite_never_exhausts() {
        assert!(invite_valid(None, 0, 10_000, t0()));
    }

    #[test]
    fn limited_invite_exhausts_at_max_uses() {
        assert!(invite_valid(None, 3, 2, t0()));
        assert!(!invite_valid(None, 3, 3, t0()));
        assert!(!invite_valid(None, 3, 4, t0()));
    }

    #[test]
    fn expiry_is_exclusive_of_the_instant() {
        let now = t0();
        assert!(invite_valid(Some(now), 0, 0, now));
        assert!(!invite_valid(Some(now - Duration::seconds(1)), 0, 0, now));
        assert!(invite_valid(Some(now + Duration::seconds(1)), 0, 0, now));
    }

    #[test]
    fn generated_codes_are_alphanumeric_and_sized() {
        for _ in 0..64 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}

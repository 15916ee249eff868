//! Shared connection and lookup helpers for the engines.

use crate::models::{RoleRow, ServerMemberRow, ServerRow, UserRow};
use crate::permissions::{Permission, PermissionFlags, resolve_permission};
use conclave_database::DbPool;
use conclave_database::schema::{member_roles, server_members, servers, users};
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

pub(crate) type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Check a connection out of the pool, mapping checkout failure to
/// `Unavailable`.
pub(crate) fn get_conn(pool: &DbPool) -> CoreResult<DbConn> {
    pool.get()
        .map_err(|e| CoreError::new(CoreErrorKind::Storage(e.to_string())))
}

pub(crate) fn find_user(conn: &mut PgConnection, user_id: i64) -> CoreResult<UserRow> {
    users::table
        .find(user_id)
        .select(UserRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::UserNotFound(user_id)))
}

pub(crate) fn user_exists(conn: &mut PgConnection, user_id: i64) -> CoreResult<bool> {
    use diesel::dsl::{exists, select};
    let present = select(exists(users::table.find(user_id))).get_result(conn)?;
    Ok(present)
}

pub(crate) fn find_server(conn: &mut PgConnection, server_id: i64) -> CoreResult<ServerRow> {
    servers::table
        .find(server_id)
        .select(ServerRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::ServerNotFound(server_id)))
}

pub(crate) fn find_membership(
    conn: &mut PgConnection,
    server_id: i64,
    user_id: i64,
) -> CoreResult<Option<ServerMemberRow>> {
    let row = server_members::table
        .filter(server_members::server_id.eq(server_id))
        .filter(server_members::user_id.eq(user_id))
        .select(ServerMemberRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// Load the membership row or fail with the distinct "not a member" error.
pub(crate) fn require_membership(
    conn: &mut PgConnection,
    server_id: i64,
    user_id: i64,
) -> CoreResult<ServerMemberRow> {
    find_membership(conn, server_id, user_id)?
        .ok_or_else(|| CoreError::new(CoreErrorKind::NotAMember { server_id, user_id }))
}

/// Flag sets of every custom role assigned to the membership.
pub(crate) fn member_flag_sets(
    conn: &mut PgConnection,
    member_id: i64,
) -> CoreResult<Vec<PermissionFlags>> {
    let roles: Vec<RoleRow> = member_roles::table
        .inner_join(conclave_database::schema::server_roles::table)
        .filter(member_roles::member_id.eq(member_id))
        .select(RoleRow::as_select())
        .load(conn)?;
    Ok(roles.iter().map(RoleRow::flags).collect())
}

/// Resolve the actor's effective permission for the server.
///
/// Errors with `NotAMember` if the actor holds no membership row; a `false`
/// result always means "member but denied".
pub(crate) fn actor_can(
    conn: &mut PgConnection,
    server: &ServerRow,
    actor_id: i64,
    permission: Permission,
) -> CoreResult<bool> {
    let membership = require_membership(conn, server.id, actor_id)?;
    let flag_sets = member_flag_sets(conn, membership.id)?;
    Ok(resolve_permission(
        server.owner_id == actor_id,
        *membership.role(),
        flag_sets,
        permission,
    ))
}

/// Like [`actor_can`] but turns a denial into `MissingPermission`, returning
/// the actor's membership row on success.
pub(crate) fn require_permission(
    conn: &mut PgConnection,
    server: &ServerRow,
    actor_id: i64,
    permission: Permission,
) -> CoreResult<ServerMemberRow> {
    let membership = require_membership(conn, server.id, actor_id)?;
    let flag_sets = member_flag_sets(conn, membership.id)?;
    let granted = resolve_permission(
        server.owner_id == actor_id,
        *membership.role(),
        flag_sets,
        permission,
    );
    if granted {
        Ok(membership)
    } else {
        Err(CoreError::new(CoreErrorKind::MissingPermission(
            permission.to_string(),
        )))
    }
}

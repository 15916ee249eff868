//! Membership & role engine.
//!
//! Owns server lifecycle, membership rows, coarse and custom roles, channel
//! administration, and permission resolution against all of it. Every
//! check-then-write sequence runs inside one transaction; uniqueness
//! constraints on (server, user) and (server, name) are the storage backstop
//! for concurrent joins and role creation.

use crate::helpers::{
    actor_can, find_membership, find_server, get_conn, require_membership, require_permission,
    user_exists,
};
use crate::models::{
    ChannelRow, CoarseRole, NewChannel, NewRoleBuilder, NewServerBuilder, NewServerMember,
    NotificationType, RoleRow, ServerMemberRow, ServerRow,
};
use crate::notify::NotificationSink;
use crate::permissions::{Permission, PermissionFlags, kick_guard};
use conclave_database::DbPool;
use conclave_database::schema::{
    channels, member_roles, message_reactions, messages, notifications, server_invites,
    server_members, server_roles, servers,
};
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::instrument;

/// Input for server creation.
#[derive(Debug, Clone)]
pub struct CreateServer {
    /// Server name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional icon URL.
    pub icon: Option<String>,
    /// Whether users may join without an invite.
    pub is_public: bool,
}

/// Partial update for server settings.
#[derive(Debug, Clone, Default)]
pub struct ServerUpdate {
    /// New name, if changing.
    pub name: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// New icon URL, if changing.
    pub icon: Option<String>,
    /// New visibility, if changing.
    pub is_public: Option<bool>,
}

/// Partial update for a membership row.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    /// New nickname, if changing.
    pub nickname: Option<String>,
    /// New coarse role, if changing. The owner's tag is immutable and
    /// nobody can be promoted to owner through this path.
    pub coarse_role: Option<CoarseRole>,
}

/// Input for role creation.
#[derive(Debug, Clone)]
pub struct RoleInput {
    /// Role name, unique per server.
    pub name: String,
    /// Display color as `#RRGGBB`; defaults to the standard grey.
    pub color: Option<String>,
    /// Hierarchy rank, higher = more senior.
    pub position: i32,
    /// Permission flags the role grants.
    pub flags: PermissionFlags,
}

/// Partial update for a role.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    /// New name, if changing.
    pub name: Option<String>,
    /// New color, if changing.
    pub color: Option<String>,
    /// New position, if changing.
    pub position: Option<i32>,
    /// Full replacement flag set, if changing.
    pub flags: Option<PermissionFlags>,
}

/// Server membership, role, and channel operations.
#[derive(Clone)]
pub struct MembershipEngine {
    pool: DbPool,
    sink: Arc<dyn NotificationSink>,
}

impl MembershipEngine {
    /// Create the engine over a pool and a notification sink.
    pub fn new(pool: DbPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Create a server owned by `owner_id`.
    ///
    /// One transaction creates the server row, the owner's membership row
    /// (coarse role `owner`, the only point where that tag is assigned),
    /// and the server's sole default role.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_server(&self, owner_id: i64, input: CreateServer) -> CoreResult<ServerRow> {
        if input.name.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "server name must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        let server = conn.transaction::<ServerRow, CoreError, _>(|conn| {
            if !user_exists(conn, owner_id)? {
                return Err(CoreError::new(CoreErrorKind::UserNotFound(owner_id)));
            }
            let new_server = NewServerBuilder::default()
                .name(input.name)
                .description(input.description)
                .icon(input.icon)
                .owner_id(owner_id)
                .is_public(input.is_public)
                .build()
                .map_err(|e| CoreError::new(CoreErrorKind::InvalidArgument(e.to_string())))?;
            let server: ServerRow = diesel::insert_into(servers::table)
                .values(&new_server)
                .returning(ServerRow::as_returning())
                .get_result(conn)?;

            diesel::insert_into(server_members::table)
                .values(&NewServerMember {
                    server_id: server.id,
                    user_id: owner_id,
                    nickname: None,
                    role: CoarseRole::Owner,
                })
                .execute(conn)?;

            let default_role = NewRoleBuilder::default()
                .server_id(server.id)
                .name("everyone")
                .is_default(true)
                .build()
                .map_err(|e| CoreError::new(CoreErrorKind::InvalidArgument(e.to_string())))?;
            diesel::insert_into(server_roles::table)
                .values(&default_role)
                .execute(conn)?;

            Ok(server)
        })?;
        tracing::info!(server_id = server.id, owner_id, "Server created");
        Ok(server)
    }

    /// Fetch a server by id.
    #[instrument(skip(self))]
    pub async fn get_server(&self, server_id: i64) -> CoreResult<ServerRow> {
        let mut conn = get_conn(&self.pool)?;
        find_server(&mut conn, server_id)
    }

    /// Update server settings. Requires `manage_server`.
    #[instrument(skip(self, changes))]
    pub async fn update_server(
        &self,
        actor_id: i64,
        server_id: i64,
        changes: ServerUpdate,
    ) -> CoreResult<ServerRow> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<ServerRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageServer)?;
            let row = diesel::update(servers::table.find(server_id))
                .set((
                    changes.name.map(|v| servers::name.eq(v)),
                    changes.description.map(|v| servers::description.eq(v)),
                    changes.icon.map(|v| servers::icon.eq(v)),
                    changes.is_public.map(|v| servers::is_public.eq(v)),
                    servers::updated_at.eq(diesel::dsl::now),
                ))
                .returning(ServerRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })
    }

    /// Delete a server and everything it owns. Owner only.
    ///
    /// Channels, messages, reactions, memberships, role assignments, roles,
    /// invites, and server-scoped notifications go in one transaction.
    #[instrument(skip(self))]
    pub async fn delete_server(&self, actor_id: i64, server_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_membership(conn, server_id, actor_id)?;
            if server.owner_id != actor_id {
                return Err(CoreError::new(CoreErrorKind::MissingPermission(
                    "server ownership".to_string(),
                )));
            }
            delete_channel_contents_for_server(conn, server_id)?;
            diesel::delete(
                notifications::table.filter(notifications::server_id.eq(server_id)),
            )
            .execute(conn)?;
            diesel::delete(channels::table.filter(channels::server_id.eq(server_id)))
                .execute(conn)?;

            let role_ids: Vec<i64> = server_roles::table
                .filter(server_roles::server_id.eq(server_id))
                .select(server_roles::id)
                .load(conn)?;
            diesel::delete(member_roles::table.filter(member_roles::role_id.eq_any(role_ids)))
                .execute(conn)?;
            diesel::delete(server_roles::table.filter(server_roles::server_id.eq(server_id)))
                .execute(conn)?;
            diesel::delete(
                server_invites::table.filter(server_invites::server_id.eq(server_id)),
            )
            .execute(conn)?;
            diesel::delete(
                server_members::table.filter(server_members::server_id.eq(server_id)),
            )
            .execute(conn)?;
            diesel::delete(servers::table.find(server_id)).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(server_id, "Server deleted");
        Ok(())
    }

    /// Join a server directly (no invite). Only public servers allow this.
    #[instrument(skip(self))]
    pub async fn join_server(&self, user_id: i64, server_id: i64) -> CoreResult<ServerMemberRow> {
        let mut conn = get_conn(&self.pool)?;
        let membership = conn.transaction::<ServerMemberRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            if !user_exists(conn, user_id)? {
                return Err(CoreError::new(CoreErrorKind::UserNotFound(user_id)));
            }
            if !*server.is_public() {
                return Err(CoreError::new(CoreErrorKind::PrivateServer(server_id)));
            }
            insert_membership(conn, server_id, user_id)
        })?;
        tracing::info!(server_id, user_id, "Member joined");
        Ok(membership)
    }

    /// Leave a server. The owner cannot leave while ownership stands.
    #[instrument(skip(self))]
    pub async fn leave_server(&self, actor_id: i64, server_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            let membership = require_membership(conn, server_id, actor_id)?;
            if server.owner_id == actor_id {
                return Err(CoreError::new(CoreErrorKind::OwnerImmutable(server_id)));
            }
            remove_membership(conn, &membership)
        })?;
        tracing::info!(server_id, user_id = actor_id, "Member left");
        Ok(())
    }

    /// Kick a member. Requires `kick_members` plus the coarse-role
    /// hierarchy: only owner/admin actors may remove admin/moderator
    /// members, and the owner can never be kicked.
    #[instrument(skip(self))]
    pub async fn kick_member(
        &self,
        actor_id: i64,
        server_id: i64,
        target_id: i64,
    ) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        let server = conn.transaction::<ServerRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            let actor = require_permission(conn, &server, actor_id, Permission::KickMembers)?;
            let target = require_membership(conn, server_id, target_id)?;
            kick_guard(actor_id, *actor.role(), target_id, *target.role(), server_id)
                .map_err(CoreError::new)?;
            remove_membership(conn, &target)?;
            Ok(server)
        })?;
        drop(conn);
        tracing::info!(server_id, target_id, actor_id, "Member kicked");

        let notification = crate::models::NewNotificationBuilder::default()
            .user_id(target_id)
            .notification_type(NotificationType::ServerEvent)
            .title("Removed from server")
            .content(format!("You were removed from {}", server.name()))
            .server_id(Some(server_id))
            .build();
        if let Ok(n) = notification {
            self.sink.enqueue(n).await;
        }
        Ok(())
    }

    /// Update a member's nickname or coarse role. Requires `manage_roles`.
    #[instrument(skip(self, changes))]
    pub async fn update_member(
        &self,
        actor_id: i64,
        server_id: i64,
        target_id: i64,
        changes: MemberUpdate,
    ) -> CoreResult<ServerMemberRow> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<ServerMemberRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;
            let target = require_membership(conn, server_id, target_id)?;
            if let Some(new_role) = changes.coarse_role {
                // Ownership transfer is out of scope: the owner's tag never
                // changes, and nobody else can acquire it.
                if server.owner_id == target_id && new_role != CoarseRole::Owner {
                    return Err(CoreError::new(CoreErrorKind::OwnerImmutable(server_id)));
                }
                if server.owner_id != target_id && new_role == CoarseRole::Owner {
                    return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                        "cannot assign the owner role".to_string(),
                    )));
                }
            }
            if changes.nickname.is_none() && changes.coarse_role.is_none() {
                return Ok(target);
            }
            let row = diesel::update(server_members::table.find(target.id))
                .set((
                    changes.nickname.map(|v| server_members::nickname.eq(v)),
                    changes.coarse_role.map(|v| server_members::role.eq(v)),
                ))
                .returning(ServerMemberRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })
    }

    /// Resolve the actor's effective permission for a server.
    ///
    /// Errors with `NotAMember` when the actor holds no membership row,
    /// never folded into a `false` result.
    #[instrument(skip(self))]
    pub async fn resolve_permission(
        &self,
        server_id: i64,
        actor_id: i64,
        permission: Permission,
    ) -> CoreResult<bool> {
        let mut conn = get_conn(&self.pool)?;
        let server = find_server(&mut conn, server_id)?;
        actor_can(&mut conn, &server, actor_id, permission)
    }

    /// List a server's membership rows. Any member may read them.
    #[instrument(skip(self))]
    pub async fn list_members(
        &self,
        actor_id: i64,
        server_id: i64,
    ) -> CoreResult<Vec<ServerMemberRow>> {
        let mut conn = get_conn(&self.pool)?;
        find_server(&mut conn, server_id)?;
        require_membership(&mut conn, server_id, actor_id)?;
        let rows = server_members::table
            .filter(server_members::server_id.eq(server_id))
            .order(server_members::joined_at.asc())
            .select(ServerMemberRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Fetch one membership row.
    #[instrument(skip(self))]
    pub async fn get_member(&self, server_id: i64, user_id: i64) -> CoreResult<ServerMemberRow> {
        let mut conn = get_conn(&self.pool)?;
        find_server(&mut conn, server_id)?;
        require_membership(&mut conn, server_id, user_id)
    }

    /// Create a custom role. Requires `manage_roles`.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_role(
        &self,
        actor_id: i64,
        server_id: i64,
        input: RoleInput,
    ) -> CoreResult<RoleRow> {
        if input.name.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "role name must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<RoleRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;

            let mut builder = NewRoleBuilder::default();
            builder
                .server_id(server_id)
                .name(input.name.clone())
                .position(input.position)
                .manage_channels(input.flags.manage_channels)
                .manage_server(input.flags.manage_server)
                .manage_roles(input.flags.manage_roles)
                .manage_messages(input.flags.manage_messages)
                .kick_members(input.flags.kick_members)
                .ban_members(input.flags.ban_members)
                .create_invites(input.flags.create_invites);
            if let Some(color) = input.color {
                builder.color(color);
            }
            let new_role = builder
                .build()
                .map_err(|e| CoreError::new(CoreErrorKind::InvalidArgument(e.to_string())))?;

            let row = diesel::insert_into(server_roles::table)
                .values(&new_role)
                .returning(RoleRow::as_returning())
                .get_result(conn)
                .map_err(|e| match CoreError::from(e) {
                    e if matches!(e.kind, CoreErrorKind::UniqueViolation(_)) => {
                        CoreError::new(CoreErrorKind::RoleNameTaken(input.name.clone()))
                    }
                    e => e,
                })?;
            Ok(row)
        })
    }

    /// Update a custom role. Requires `manage_roles`.
    #[instrument(skip(self, changes))]
    pub async fn update_role(
        &self,
        actor_id: i64,
        server_id: i64,
        role_id: i64,
        changes: RoleUpdate,
    ) -> CoreResult<RoleRow> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<RoleRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;
            find_role(conn, server_id, role_id)?;
            let row = diesel::update(server_roles::table.find(role_id))
                .set((
                    changes.name.map(|v| server_roles::name.eq(v)),
                    changes.color.map(|v| server_roles::color.eq(v)),
                    changes.position.map(|v| server_roles::position.eq(v)),
                    changes.flags.map(|f| {
                        (
                            server_roles::manage_channels.eq(f.manage_channels),
                            server_roles::manage_server.eq(f.manage_server),
                            server_roles::manage_roles.eq(f.manage_roles),
                            server_roles::manage_messages.eq(f.manage_messages),
                            server_roles::kick_members.eq(f.kick_members),
                            server_roles::ban_members.eq(f.ban_members),
                            server_roles::create_invites.eq(f.create_invites),
                        )
                    }),
                    server_roles::updated_at.eq(diesel::dsl::now),
                ))
                .returning(RoleRow::as_returning())
                .get_result(conn)
                .map_err(|e| match CoreError::from(e) {
                    e if matches!(e.kind, CoreErrorKind::UniqueViolation(_)) => {
                        CoreError::new(CoreErrorKind::RoleNameTaken(
                            "role name already in use".to_string(),
                        ))
                    }
                    e => e,
                })?;
            Ok(row)
        })
    }

    /// Delete a custom role and its assignments. Requires `manage_roles`.
    ///
    /// The server's sole default role is rejected, not reassigned: the
    /// server must always retain exactly one default role.
    #[instrument(skip(self))]
    pub async fn delete_role(
        &self,
        actor_id: i64,
        server_id: i64,
        role_id: i64,
    ) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;
            let role = find_role(conn, server_id, role_id)?;
            if *role.is_default() {
                return Err(CoreError::new(CoreErrorKind::DefaultRoleImmutable(role_id)));
            }
            diesel::delete(member_roles::table.filter(member_roles::role_id.eq(role_id)))
                .execute(conn)?;
            diesel::delete(server_roles::table.find(role_id)).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(server_id, role_id, "Role deleted");
        Ok(())
    }

    /// List a server's roles, most senior first. Any member may read them.
    #[instrument(skip(self))]
    pub async fn list_roles(&self, actor_id: i64, server_id: i64) -> CoreResult<Vec<RoleRow>> {
        let mut conn = get_conn(&self.pool)?;
        find_server(&mut conn, server_id)?;
        require_membership(&mut conn, server_id, actor_id)?;
        let rows = server_roles::table
            .filter(server_roles::server_id.eq(server_id))
            .order(server_roles::position.desc())
            .select(RoleRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Assign a custom role to a member. Requires `manage_roles`.
    /// Re-assigning an already-held role is a no-op.
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        actor_id: i64,
        server_id: i64,
        target_id: i64,
        role_id: i64,
    ) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;
            find_role(conn, server_id, role_id)?;
            let target = require_membership(conn, server_id, target_id)?;
            diesel::insert_into(member_roles::table)
                .values(&crate::models::MemberRole {
                    member_id: target.id,
                    role_id,
                })
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
    }

    /// Remove a custom role from a member. Requires `manage_roles`.
    #[instrument(skip(self))]
    pub async fn unassign_role(
        &self,
        actor_id: i64,
        server_id: i64,
        target_id: i64,
        role_id: i64,
    ) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageRoles)?;
            find_role(conn, server_id, role_id)?;
            let target = require_membership(conn, server_id, target_id)?;
            let deleted = diesel::delete(
                member_roles::table
                    .filter(member_roles::member_id.eq(target.id))
                    .filter(member_roles::role_id.eq(role_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(CoreError::new(CoreErrorKind::RecordNotFound));
            }
            Ok(())
        })
    }

    /// Create a channel. Requires `manage_channels`.
    #[instrument(skip(self))]
    pub async fn create_channel(
        &self,
        actor_id: i64,
        server_id: i64,
        name: &str,
        channel_type: Option<&str>,
    ) -> CoreResult<ChannelRow> {
        if name.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "channel name must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<ChannelRow, CoreError, _>(|conn| {
            let server = find_server(conn, server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageChannels)?;
            let row = diesel::insert_into(channels::table)
                .values(&NewChannel {
                    server_id,
                    name: name.to_string(),
                    channel_type: channel_type.unwrap_or("text").to_string(),
                })
                .returning(ChannelRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })
    }

    /// Rename a channel. Requires `manage_channels`.
    #[instrument(skip(self))]
    pub async fn update_channel(
        &self,
        actor_id: i64,
        channel_id: i64,
        name: &str,
    ) -> CoreResult<ChannelRow> {
        if name.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "channel name must not be empty".to_string(),
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<ChannelRow, CoreError, _>(|conn| {
            let channel = find_channel(conn, channel_id)?;
            let server = find_server(conn, channel.server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageChannels)?;
            let row = diesel::update(channels::table.find(channel_id))
                .set(channels::name.eq(name))
                .returning(ChannelRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })
    }

    /// Delete a channel and its messages. Requires `manage_channels`.
    #[instrument(skip(self))]
    pub async fn delete_channel(&self, actor_id: i64, channel_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let channel = find_channel(conn, channel_id)?;
            let server = find_server(conn, channel.server_id)?;
            require_permission(conn, &server, actor_id, Permission::ManageChannels)?;
            delete_channel_contents(conn, channel_id)?;
            diesel::delete(channels::table.find(channel_id)).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(channel_id, "Channel deleted");
        Ok(())
    }
}

/// Insert a plain membership row, mapping the unique-pair backstop to
/// `AlreadyMember`. Shared with invite redemption.
pub(crate) fn insert_membership(
    conn: &mut PgConnection,
    server_id: i64,
    user_id: i64,
) -> CoreResult<ServerMemberRow> {
    if find_membership(conn, server_id, user_id)?.is_some() {
        return Err(CoreError::new(CoreErrorKind::AlreadyMember {
            server_id,
            user_id,
        }));
    }
    diesel::insert_into(server_members::table)
        .values(&NewServerMember {
            server_id,
            user_id,
            nickname: None,
            role: CoarseRole::Member,
        })
        .returning(ServerMemberRow::as_returning())
        .get_result(conn)
        .map_err(|e| match CoreError::from(e) {
            e if matches!(e.kind, CoreErrorKind::UniqueViolation(_)) => {
                CoreError::new(CoreErrorKind::AlreadyMember { server_id, user_id })
            }
            e => e,
        })
}

/// Delete a membership row together with its custom-role assignments.
fn remove_membership(conn: &mut PgConnection, membership: &ServerMemberRow) -> CoreResult<()> {
    diesel::delete(member_roles::table.filter(member_roles::member_id.eq(membership.id)))
        .execute(conn)?;
    diesel::delete(server_members::table.find(membership.id)).execute(conn)?;
    Ok(())
}

fn find_role(conn: &mut PgConnection, server_id: i64, role_id: i64) -> CoreResult<RoleRow> {
    server_roles::table
        .find(role_id)
        .filter(server_roles::server_id.eq(server_id))
        .select(RoleRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::RoleNotFound(role_id)))
}

pub(crate) fn find_channel(conn: &mut PgConnection, channel_id: i64) -> CoreResult<ChannelRow> {
    channels::table
        .find(channel_id)
        .select(ChannelRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::ChannelNotFound(channel_id)))
}

/// Delete one channel's messages, their reactions, and notifications that
/// reference either.
fn delete_channel_contents(conn: &mut PgConnection, channel_id: i64) -> CoreResult<()> {
    let message_ids: Vec<i64> = messages::table
        .filter(messages::channel_id.eq(channel_id))
        .select(messages::id)
        .load(conn)?;
    diesel::delete(
        message_reactions::table.filter(message_reactions::message_id.eq_any(message_ids.clone())),
    )
    .execute(conn)?;
    diesel::delete(notifications::table.filter(notifications::message_id.eq_any(message_ids)))
        .execute(conn)?;
    diesel::delete(notifications::table.filter(notifications::channel_id.eq(channel_id)))
        .execute(conn)?;
    diesel::delete(messages::table.filter(messages::channel_id.eq(channel_id))).execute(conn)?;
    Ok(())
}

/// Delete the channel-bound content of every channel of a server.
fn delete_channel_contents_for_server(conn: &mut PgConnection, server_id: i64) -> CoreResult<()> {
    let channel_ids: Vec<i64> = channels::table
        .filter(channels::server_id.eq(server_id))
        .select(channels::id)
        .load(conn)?;
    for channel_id in channel_ids {
        delete_channel_contents(conn, channel_id)?;
    }
    Ok(())
}

//! Custom server role models.

use crate::permissions::{Permission, PermissionFlags};
use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the server_roles table.
///
/// Unique per (server, name). Position ranks seniority (higher = more
/// senior). At most one role per server carries `is_default`, and that role
/// cannot be deleted.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations, serde::Serialize, derive_getters::Getters)]
#[diesel(belongs_to(super::server::ServerRow, foreign_key = server_id))]
#[diesel(table_name = conclave_database::schema::server_roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoleRow {
    /// Role ID
    pub id: i64,
    /// Server ID
    pub server_id: i64,
    name: String,
    color: String,
    position: i32,
    is_default: bool,
    manage_channels: bool,
    manage_server: bool,
    manage_roles: bool,
    manage_messages: bool,
    kick_members: bool,
    ban_members: bool,
    create_invites: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl RoleRow {
    /// Whether this role grants the given permission.
    pub fn grants(&self, permission: Permission) -> bool {
        self.flags().grants(permission)
    }

    /// The role's permission flags as a plain value.
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            manage_channels: self.manage_channels,
            manage_server: self.manage_server,
            manage_roles: self.manage_roles,
            manage_messages: self.manage_messages,
            kick_members: self.kick_members,
            ban_members: self.ban_members,
            create_invites: self.create_invites,
        }
    }
}

/// Insertable struct for the server_roles table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters, derive_builder::Builder)]
#[diesel(table_name = conclave_database::schema::server_roles)]
#[builder(setter(into))]
pub struct NewRole {
    pub(crate) server_id: i64,
    pub(crate) name: String,
    #[builder(default = "String::from(\"#99AAB5\")")]
    pub(crate) color: String,
    #[builder(default)]
    pub(crate) position: i32,
    #[builder(default)]
    pub(crate) is_default: bool,
    #[builder(default)]
    pub(crate) manage_channels: bool,
    #[builder(default)]
    pub(crate) manage_server: bool,
    #[builder(default)]
    pub(crate) manage_roles: bool,
    #[builder(default)]
    pub(crate) manage_messages: bool,
    #[builder(default)]
    pub(crate) kick_members: bool,
    #[builder(default)]
    pub(crate) ban_members: bool,
    #[builder(default = "true")]
    pub(crate) create_invites: bool,
}

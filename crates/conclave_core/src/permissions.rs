//! Permission resolution.
//!
//! Every mutating or reading operation against a server resolves the actor's
//! effective permission through [`resolve_permission`], a pure function over
//! the actor's loaded membership state. Precedence, evaluated short-circuit:
//!
//! 1. Server owner → granted, for every permission.
//! 2. Coarse role admin → granted, except `manage_server`.
//! 3. Any assigned custom role with the flag set → granted.
//! 4. Coarse role moderator → granted for `manage_messages`,
//!    `kick_members`, `create_invites`.
//! 5. `create_invites` → granted to any member (baseline).
//! 6. Otherwise → denied.
//!
//! "Not a member" is never expressed as a denied permission: engines return
//! a distinct not-found error before resolution runs.

use crate::models::CoarseRole;
use conclave_error::CoreErrorKind;

/// The fixed set of server permissions.
///
/// A deliberate enum rather than string lookup: every flag a role can carry
/// appears here, and [`PermissionFlags::grants`] is the single mapping from
/// permission kind to flag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    /// Create, rename, and delete server channels.
    ManageChannels,
    /// Edit server settings (name, visibility, ...).
    ManageServer,
    /// Create/edit/delete roles and member role assignments.
    ManageRoles,
    /// Delete other members' channel messages.
    ManageMessages,
    /// Remove members from the server.
    KickMembers,
    /// Ban members from the server.
    BanMembers,
    /// Create server invites.
    CreateInvites,
}

/// Boolean permission flags carried by a custom role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionFlags {
    /// Grants [`Permission::ManageChannels`].
    pub manage_channels: bool,
    /// Grants [`Permission::ManageServer`].
    pub manage_server: bool,
    /// Grants [`Permission::ManageRoles`].
    pub manage_roles: bool,
    /// Grants [`Permission::ManageMessages`].
    pub manage_messages: bool,
    /// Grants [`Permission::KickMembers`].
    pub kick_members: bool,
    /// Grants [`Permission::BanMembers`].
    pub ban_members: bool,
    /// Grants [`Permission::CreateInvites`].
    pub create_invites: bool,
}

impl PermissionFlags {
    /// Whether the flag for `permission` is set.
    pub fn grants(&self, permission: Permission) -> bool {
        match permission {
            Permission::ManageChannels => self.manage_channels,
            Permission::ManageServer => self.manage_server,
            Permission::ManageRoles => self.manage_roles,
            Permission::ManageMessages => self.manage_messages,
            Permission::KickMembers => self.kick_members,
            Permission::BanMembers => self.ban_members,
            Permission::CreateInvites => self.create_invites,
        }
    }
}

/// Resolve the actor's effective permission from loaded membership state.
///
/// `is_owner` is the server-ownership check (step 1), `coarse` the member
/// row's legacy role tag, `role_flags` the flag sets of the member's
/// assigned custom roles.
pub fn resolve_permission<I>(
    is_owner: bool,
    coarse: CoarseRole,
    role_flags: I,
    permission: Permission,
) -> bool
where
    I: IntoIterator<Item = PermissionFlags>,
{
    if is_owner {
        return true;
    }
    if coarse == CoarseRole::Admin && permission != Permission::ManageServer {
        return true;
    }
    if role_flags.into_iter().any(|flags| flags.grants(permission)) {
        return true;
    }
    if coarse == CoarseRole::Moderator
        && matches!(
            permission,
            Permission::ManageMessages | Permission::KickMembers | Permission::CreateInvites
        )
    {
        return true;
    }
    permission == Permission::CreateInvites
}

/// Hierarchy guard for kick operations.
///
/// The owner can never be kicked, self-kick is rejected (leaving is a
/// different operation), and only owner/admin actors may remove
/// admin/moderator members. Permission resolution happens before this guard;
/// the guard only orders coarse roles.
pub fn kick_guard(
    actor_id: i64,
    actor_coarse: CoarseRole,
    target_id: i64,
    target_coarse: CoarseRole,
    server_id: i64,
) -> Result<(), CoreErrorKind> {
    if target_coarse == CoarseRole::Owner {
        return Err(CoreErrorKind::OwnerImmutable(server_id));
    }
    if target_id == actor_id {
        return Err(CoreErrorKind::SelfTarget("kick_member"));
    }
    if !actor_coarse.is_privileged() && target_coarse.is_protected() {
        return Err(CoreErrorKind::HierarchyViolation {
            target_role: target_coarse.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn flags(set: impl Fn(&mut PermissionFlags)) -> PermissionFlags {
        let mut f = PermissionFlags::default();
        set(&mut f);
        f
    }

    #[test]
    fn owner_holds_every_permission() {
        for permission in Permission::iter() {
            assert!(resolve_permission(
                true,
                CoarseRole::Owner,
                [],
                permission
            ));
        }
    }

    #[test]
    fn admin_holds_everything_but_manage_server() {
        for permission in Permission::iter() {
            let granted = resolve_permission(false, CoarseRole::Admin, [], permission);
            assert_eq!(granted, permission != Permission::ManageServer);
        }
    }

    #[test]
    fn custom_role_flag_grants_the_permission() {
        let kick = flags(|f| f.kick_members = true);
        assert!(resolve_permission(
            false,
            CoarseRole::Member,
            [kick],
            Permission::KickMembers
        ));
        assert!(!resolve_permission(
            false,
            CoarseRole::Member,
            [kick],
            Permission::ManageRoles
        ));
    }

    #[test]
    fn any_of_several_roles_suffices() {
        let a = flags(|f| f.manage_channels = true);
        let b = flags(|f| f.manage_messages = true);
        assert!(resolve_permission(
            false,
            CoarseRole::Member,
            [a, b],
            Permission::ManageMessages
        ));
    }

    #[test]
    fn moderator_baseline() {
        for permission in Permission::iter() {
            let granted = resolve_permission(false, CoarseRole::Moderator, [], permission);
            let expected = matches!(
                permission,
                Permission::ManageMessages | Permission::KickMembers | Permission::CreateInvites
            );
            assert_eq!(granted, expected, "{permission}");
        }
    }

    #[test]
    fn every_member_may_create_invites() {
        assert!(resolve_permission(
            false,
            CoarseRole::Member,
            [],
            Permission::CreateInvites
        ));
    }

    #[test]
    fn plain_member_denied_everything_else() {
        for permission in Permission::iter() {
            if permission == Permission::CreateInvites {
                continue;
            }
            assert!(
                !resolve_permission(false, CoarseRole::Member, [], permission),
                "{permission}"
            );
        }
    }

    #[test]
    fn admin_with_manage_server_role_flag_gets_manage_server() {
        // Step 2 denies manage_server to admins, but step 3 can still grant
        // it through an assigned role.
        let f = flags(|f| f.manage_server = true);
        assert!(resolve_permission(
            false,
            CoarseRole::Admin,
            [f],
            Permission::ManageServer
        ));
    }

    #[test]
    fn kick_guard_protects_the_owner() {
        let err = kick_guard(2, CoarseRole::Admin, 1, CoarseRole::Owner, 7).unwrap_err();
        assert_eq!(err, CoreErrorKind::OwnerImmutable(7));
    }

    #[test]
    fn kick_guard_rejects_self_kick() {
        let err = kick_guard(2, CoarseRole::Admin, 2, CoarseRole::Admin, 7).unwrap_err();
        assert_eq!(err, CoreErrorKind::SelfTarget("kick_member"));
    }

    #[test]
    fn unprivileged_kicker_cannot_remove_protected_members() {
        for target in [CoarseRole::Admin, CoarseRole::Moderator] {
            let err = kick_guard(2, CoarseRole::Member, 3, target, 7).unwrap_err();
            assert!(matches!(err, CoreErrorKind::HierarchyViolation { .. }));
        }
        // Plain members stay kickable by anyone who resolved kick_members.
        assert!(kick_guard(2, CoarseRole::Member, 3, CoarseRole::Member, 7).is_ok());
    }

    #[test]
    fn owner_and_admin_may_remove_protected_members() {
        for actor in [CoarseRole::Owner, CoarseRole::Admin] {
            for target in [CoarseRole::Admin, CoarseRole::Moderator, CoarseRole::Member] {
                assert!(kick_guard(2, actor, 3, target, 7).is_ok(), "{actor}->{target}");
            }
        }
    }
}

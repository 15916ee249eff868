//! Integration tests for the membership & role engine.

mod common;

use common::*;
use conclave_core::models::CoarseRole;
use conclave_core::{CreateServer, MemberUpdate, Permission, PermissionFlags, RoleInput};
use conclave_error::{CoreErrorKind, ErrorClass};

fn server_input(name: String) -> CreateServer {
    CreateServer {
        name,
        description: None,
        icon: None,
        is_public: false,
    }
}

fn public_server_input(name: String) -> CreateServer {
    CreateServer {
        is_public: true,
        ..server_input(name)
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn creating_a_server_seats_the_owner() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let owner = new_user(&users, "owner").await;
    let server = engine
        .create_server(owner.id, server_input(unique("guild")))
        .await
        .expect("create server");

    let member = engine.get_member(server.id, owner.id).await.expect("owner row");
    assert_eq!(*member.role(), CoarseRole::Owner);

    // Owner resolves every permission, including manage_server.
    for permission in [
        Permission::ManageServer,
        Permission::ManageRoles,
        Permission::KickMembers,
    ] {
        assert!(
            engine
                .resolve_permission(server.id, owner.id, permission)
                .await
                .expect("resolution"),
        );
    }

    // The default role exists and refuses deletion.
    let roles = engine.list_roles(owner.id, server.id).await.expect("roles");
    let default_role = roles.iter().find(|r| *r.is_default()).expect("default role");
    let err = engine
        .delete_role(owner.id, server.id, default_role.id)
        .await
        .expect_err("default role must not be deletable");
    assert_eq!(err.class(), ErrorClass::Conflict);
    let still_there = engine.list_roles(owner.id, server.id).await.expect("roles");
    assert!(still_there.iter().any(|r| r.id == default_role.id));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn non_member_resolution_is_not_found_not_false() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let owner = new_user(&users, "owner").await;
    let stranger = new_user(&users, "stranger").await;
    let server = engine
        .create_server(owner.id, server_input(unique("guild")))
        .await
        .expect("create server");

    let err = engine
        .resolve_permission(server.id, stranger.id, Permission::CreateInvites)
        .await
        .expect_err("stranger is not a member");
    assert!(matches!(err.kind, CoreErrorKind::NotAMember { .. }));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn custom_kick_role_respects_the_coarse_hierarchy() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let a = new_user(&users, "a").await;
    let b = new_user(&users, "b").await;
    let c = new_user(&users, "c").await;
    let d = new_user(&users, "d").await;

    let server = engine
        .create_server(a.id, public_server_input(unique("guild")))
        .await
        .expect("create server");
    for user in [&b, &c, &d] {
        engine.join_server(user.id, server.id).await.expect("join");
    }
    engine
        .update_member(
            a.id,
            server.id,
            d.id,
            MemberUpdate {
                coarse_role: Some(CoarseRole::Admin),
                ..MemberUpdate::default()
            },
        )
        .await
        .expect("promote d to admin");

    // B cannot kick anyone yet.
    let err = engine.kick_member(b.id, server.id, c.id).await.expect_err("no permission");
    assert!(matches!(err.kind, CoreErrorKind::MissingPermission(_)));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    // Role "Mod" with kick_members, assigned to B.
    let moderator_role = engine
        .create_role(
            a.id,
            server.id,
            RoleInput {
                name: "Mod".to_string(),
                color: None,
                position: 1,
                flags: PermissionFlags {
                    kick_members: true,
                    ..PermissionFlags::default()
                },
            },
        )
        .await
        .expect("create role");
    engine
        .assign_role(a.id, server.id, b.id, moderator_role.id)
        .await
        .expect("assign role");

    // B can now kick the unprivileged C, but not admin D.
    engine.kick_member(b.id, server.id, c.id).await.expect("kick c");
    let err = engine.kick_member(b.id, server.id, d.id).await.expect_err("d is protected");
    assert!(matches!(err.kind, CoreErrorKind::HierarchyViolation { .. }));

    // The owner can.
    engine.kick_member(a.id, server.id, d.id).await.expect("owner kicks d");

    // Nobody can kick the owner.
    engine.join_server(d.id, server.id).await.expect("rejoin");
    engine
        .update_member(
            a.id,
            server.id,
            d.id,
            MemberUpdate {
                coarse_role: Some(CoarseRole::Admin),
                ..MemberUpdate::default()
            },
        )
        .await
        .expect("promote d again");
    let err = engine.kick_member(d.id, server.id, a.id).await.expect_err("owner immutable");
    assert!(matches!(err.kind, CoreErrorKind::OwnerImmutable(_)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn membership_rows_are_unique_per_server_and_user() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let owner = new_user(&users, "owner").await;
    let joiner = new_user(&users, "joiner").await;
    let server = engine
        .create_server(owner.id, public_server_input(unique("guild")))
        .await
        .expect("create server");

    engine.join_server(joiner.id, server.id).await.expect("first join");
    let err = engine
        .join_server(joiner.id, server.id)
        .await
        .expect_err("second join must conflict");
    assert!(matches!(err.kind, CoreErrorKind::AlreadyMember { .. }));

    let members = engine.list_members(owner.id, server.id).await.expect("members");
    let rows_for_joiner = members.iter().filter(|m| m.user_id == joiner.id).count();
    assert_eq!(rows_for_joiner, 1);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn private_servers_reject_direct_joins() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let owner = new_user(&users, "owner").await;
    let outsider = new_user(&users, "outsider").await;
    let server = engine
        .create_server(owner.id, server_input(unique("guild")))
        .await
        .expect("create server");

    let err = engine
        .join_server(outsider.id, server.id)
        .await
        .expect_err("private server");
    assert!(matches!(err.kind, CoreErrorKind::PrivateServer(_)));
    assert_eq!(err.class(), ErrorClass::Forbidden);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn owner_tag_is_immutable_and_owner_cannot_leave() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);

    let owner = new_user(&users, "owner").await;
    let server = engine
        .create_server(owner.id, server_input(unique("guild")))
        .await
        .expect("create server");

    let err = engine
        .update_member(
            owner.id,
            server.id,
            owner.id,
            MemberUpdate {
                coarse_role: Some(CoarseRole::Member),
                ..MemberUpdate::default()
            },
        )
        .await
        .expect_err("owner tag immutable");
    assert!(matches!(err.kind, CoreErrorKind::OwnerImmutable(_)));

    let err = engine
        .leave_server(owner.id, server.id)
        .await
        .expect_err("owner cannot leave");
    assert!(matches!(err.kind, CoreErrorKind::OwnerImmutable(_)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn deleting_a_server_cascades_to_everything_it_owns() {
    let pool = pool();
    let users = identity(&pool);
    let engine = membership(&pool);
    let invite_engine = invites(&pool);
    let message_engine = messaging(&pool);

    let owner = new_user(&users, "owner").await;
    let member = new_user(&users, "member").await;
    let server = engine
        .create_server(owner.id, public_server_input(unique("guild")))
        .await
        .expect("create server");
    engine.join_server(member.id, server.id).await.expect("join");
    let channel = engine
        .create_channel(owner.id, server.id, "general", None)
        .await
        .expect("channel");
    message_engine
        .post_message(
            member.id,
            conclave_core::MessageDestination::Channel(channel.id),
            "hello",
        )
        .await
        .expect("post");
    invite_engine
        .create_invite(member.id, server.id, 0, None)
        .await
        .expect("invite");

    engine.delete_server(owner.id, server.id).await.expect("delete server");

    let err = engine.get_server(server.id).await.expect_err("gone");
    assert!(matches!(err.kind, CoreErrorKind::ServerNotFound(_)));
    let err = message_engine
        .channel_messages(member.id, channel.id, 10)
        .await
        .expect_err("channel gone");
    assert!(matches!(err.kind, CoreErrorKind::ChannelNotFound(_)));
}

//! Integration tests for the invite engine.

mod common;

use chrono::{Duration, Utc};
use common::*;
use conclave_core::CreateServer;
use conclave_error::{CoreErrorKind, ErrorClass};

fn guild(name: String) -> CreateServer {
    CreateServer {
        name,
        description: None,
        icon: None,
        is_public: false,
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn redemption_joins_the_server_once() {
    let pool = pool();
    let users = identity(&pool);
    let servers = membership(&pool);
    let engine = invites(&pool);

    let owner = new_user(&users, "owner").await;
    let joiner = new_user(&users, "joiner").await;
    let server = servers
        .create_server(owner.id, guild(unique("guild")))
        .await
        .expect("create server");
    let invite = engine
        .create_invite(owner.id, server.id, 0, None)
        .await
        .expect("create invite");

    let member = engine.redeem(invite.code(), joiner.id).await.expect("redeem");
    assert_eq!(member.server_id, server.id);
    assert_eq!(member.user_id, joiner.id);

    // A second redemption by the same user is a membership conflict.
    let err = engine
        .redeem(invite.code(), joiner.id)
        .await
        .expect_err("already a member");
    assert!(matches!(err.kind, CoreErrorKind::AlreadyMember { .. }));

    // The failed attempt must not have consumed a use.
    let current = engine.get_invite(invite.code()).await.expect("reload");
    assert_eq!(*current.uses(), 1);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn unknown_codes_are_not_found() {
    let pool = pool();
    let engine = invites(&pool);
    let err = engine.redeem("NOSUCH00", 1).await.expect_err("unknown code");
    assert!(matches!(err.kind, CoreErrorKind::InviteNotFound(_)));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn expired_invites_conflict() {
    let pool = pool();
    let users = identity(&pool);
    let servers = membership(&pool);
    let engine = invites(&pool);

    let owner = new_user(&users, "owner").await;
    let joiner = new_user(&users, "joiner").await;
    let server = servers
        .create_server(owner.id, guild(unique("guild")))
        .await
        .expect("create server");
    let yesterday = Utc::now().naive_utc() - Duration::days(1);
    let invite = engine
        .create_invite(owner.id, server.id, 0, Some(yesterday))
        .await
        .expect("create invite");

    let err = engine
        .redeem(invite.code(), joiner.id)
        .await
        .expect_err("expired");
    assert!(matches!(err.kind, CoreErrorKind::InviteExpired(_)));
    assert_eq!(err.class(), ErrorClass::Conflict);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn concurrent_redemptions_never_oversubscribe() {
    let pool = pool();
    let users = identity(&pool);
    let servers = membership(&pool);
    let engine = invites(&pool);

    let owner = new_user(&users, "owner").await;
    let first = new_user(&users, "first").await;
    let second = new_user(&users, "second").await;
    let server = servers
        .create_server(owner.id, guild(unique("guild")))
        .await
        .expect("create server");
    let invite = engine
        .create_invite(owner.id, server.id, 1, None)
        .await
        .expect("create invite");

    let (left, right) = {
        let (e1, c1, u1) = (engine.clone(), invite.code().clone(), first.id);
        let (e2, c2, u2) = (engine.clone(), invite.code().clone(), second.id);
        tokio::join!(
            tokio::spawn(async move { e1.redeem(&c1, u1).await }),
            tokio::spawn(async move { e2.redeem(&c2, u2).await }),
        )
    };
    let outcomes = [left.expect("join"), right.expect("join")];

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two racing redemptions wins");
    let conflict = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one failure");
    assert_eq!(conflict.class(), ErrorClass::Conflict);

    let current = engine.get_invite(invite.code()).await.expect("reload");
    assert!(*current.uses() <= *current.max_uses());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn every_member_may_create_invites_but_listing_needs_manage_server() {
    let pool = pool();
    let users = identity(&pool);
    let servers = membership(&pool);
    let engine = invites(&pool);

    let owner = new_user(&users, "owner").await;
    let member = new_user(&users, "member").await;
    let server = servers
        .create_server(
            owner.id,
            CreateServer {
                is_public: true,
                ..guild(unique("guild"))
            },
        )
        .await
        .expect("create server");
    servers.join_server(member.id, server.id).await.expect("join");

    // Baseline grant: a plain member can mint invites.
    engine
        .create_invite(member.id, server.id, 5, None)
        .await
        .expect("member invite");

    let err = engine
        .list_invites(member.id, server.id)
        .await
        .expect_err("listing is manage_server");
    assert!(matches!(err.kind, CoreErrorKind::MissingPermission(_)));
    assert!(!engine.list_invites(owner.id, server.id).await.expect("owner lists").is_empty());
}

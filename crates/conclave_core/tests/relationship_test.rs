//! Integration tests for the relationship engine.

mod common;

use common::*;
use conclave_error::{CoreErrorKind, ErrorClass};

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn acceptance_creates_both_edges_atomically() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    let request = engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("send request");
    let accepted = engine
        .accept_friend_request(bob.id, request.id)
        .await
        .expect("accept");
    assert!(accepted.status().is_terminal());

    // Both symmetric edges exist immediately after acceptance.
    let alices = engine.list_friends(alice.id).await.expect("alice's friends");
    let bobs = engine.list_friends(bob.id).await.expect("bob's friends");
    assert!(alices.iter().any(|u| u.id == bob.id));
    assert!(bobs.iter().any(|u| u.id == alice.id));

    // Sending again is AlreadyFriends, in either direction.
    for (from, to) in [(alice.id, bob.id), (bob.id, alice.id)] {
        let err = engine
            .send_friend_request(from, to)
            .await
            .expect_err("already friends");
        assert!(matches!(err.kind, CoreErrorKind::AlreadyFriends { .. }));
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn only_the_receiver_may_respond_and_terminal_states_stick() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    let request = engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("send request");

    let err = engine
        .accept_friend_request(alice.id, request.id)
        .await
        .expect_err("sender cannot accept");
    assert!(matches!(err.kind, CoreErrorKind::NotRequestReceiver(_)));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    engine
        .reject_friend_request(bob.id, request.id)
        .await
        .expect("reject");
    let err = engine
        .accept_friend_request(bob.id, request.id)
        .await
        .expect_err("rejected is terminal");
    assert!(matches!(err.kind, CoreErrorKind::RequestNotPending { .. }));
    assert_eq!(err.class(), ErrorClass::Conflict);

    // A fresh request may follow a resolved one.
    engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("resend after rejection");
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn duplicate_pending_requests_conflict_in_both_directions() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("send request");
    for (from, to) in [(alice.id, bob.id), (bob.id, alice.id)] {
        let err = engine
            .send_friend_request(from, to)
            .await
            .expect_err("pending already");
        assert!(matches!(err.kind, CoreErrorKind::RequestAlreadyPending(_)));
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn self_requests_are_invalid() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);
    let alice = new_user(&users, "alice").await;

    let err = engine
        .send_friend_request(alice.id, alice.id)
        .await
        .expect_err("self request");
    assert_eq!(err.class(), ErrorClass::InvalidArgument);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn blocking_rejects_the_pending_request_and_forbids_resends() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    let request = engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("send request");

    // Bob blocks Alice before responding.
    engine.block_user(bob.id, alice.id).await.expect("block");

    // The pending request became rejected as a side effect.
    let err = engine
        .accept_friend_request(bob.id, request.id)
        .await
        .expect_err("request was rejected by the block");
    assert!(matches!(err.kind, CoreErrorKind::RequestNotPending { .. }));

    // While the block stands, Alice is forbidden from resending, not merely
    // deduplicated.
    let err = engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect_err("blocked");
    assert!(matches!(err.kind, CoreErrorKind::Blocked { .. }));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    // Blocks are directed: Bob's block does not mean Alice blocked Bob, and
    // unblocking lifts the gate.
    let bobs_blocks = engine.blocked_users(bob.id).await.expect("block list");
    assert!(bobs_blocks.iter().any(|b| b.blocked_id == alice.id));
    assert!(engine.blocked_users(alice.id).await.expect("block list").is_empty());
    engine.unblock_user(bob.id, alice.id).await.expect("unblock");
    engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("resend after unblock");
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn blocking_tears_down_an_existing_friendship() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    let request = engine
        .send_friend_request(alice.id, bob.id)
        .await
        .expect("send request");
    engine
        .accept_friend_request(bob.id, request.id)
        .await
        .expect("accept");

    engine.block_user(alice.id, bob.id).await.expect("block");

    // Neither side keeps an edge; never one without the other.
    assert!(!engine.list_friends(alice.id).await.expect("friends").iter().any(|u| u.id == bob.id));
    assert!(!engine.list_friends(bob.id).await.expect("friends").iter().any(|u| u.id == alice.id));

    let err = engine
        .remove_friend(alice.id, bob.id)
        .await
        .expect_err("no friendship left");
    assert!(matches!(err.kind, CoreErrorKind::NotFriends { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires a migrated PostgreSQL via DATABASE_URL"]
async fn concurrent_sends_create_exactly_one_request() {
    let pool = pool();
    let users = identity(&pool);
    let engine = relationships(&pool);

    let alice = new_user(&users, "alice").await;
    let bob = new_user(&users, "bob").await;

    let (left, right) = {
        let (e1, a1, b1) = (engine.clone(), alice.id, bob.id);
        let (e2, a2, b2) = (engine.clone(), alice.id, bob.id);
        tokio::join!(
            tokio::spawn(async move { e1.send_friend_request(a1, b1).await }),
            tokio::spawn(async move { e2.send_friend_request(a2, b2).await }),
        )
    };
    let outcomes = [left.expect("join"), right.expect("join")];

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "unique pair constraint backstops the race");
    let failure = outcomes.iter().find_map(|r| r.as_ref().err()).expect("one failure");
    assert_eq!(failure.class(), ErrorClass::Conflict);

    let pending = engine.pending_requests(bob.id).await.expect("pending");
    assert_eq!(pending.iter().filter(|r| r.sender_id == alice.id).count(), 1);
}

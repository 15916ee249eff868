//! Shared test setup: pooled connection, migrations, and fixture users.
//!
//! Integration tests run against the PostgreSQL instance named by
//! `DATABASE_URL` (loaded via `.env` when present) and are `#[ignore]`d so
//! plain `cargo test` passes without one. Run them with `cargo test --
//! --ignored` against a scratch database.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use conclave_core::models::UserRow;
use conclave_core::{
    IdentityStore, InviteEngine, MembershipEngine, MessagingEngine, NotificationSink,
    NullNotificationSink, RelationshipEngine,
};
use conclave_database::{DbPool, create_pool, establish_connection, run_migrations};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pool against the migrated test database.
pub fn pool() -> DbPool {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        let mut conn = establish_connection().expect("DATABASE_URL must point at a test database");
        run_migrations(&mut conn).expect("migrations must apply");
    });
    create_pool().expect("pool creation")
}

/// Unique suffix so fixtures never collide across tests or runs.
pub fn unique(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{n}", std::process::id())
}

pub fn null_sink() -> Arc<dyn NotificationSink> {
    Arc::new(NullNotificationSink)
}

pub fn identity(pool: &DbPool) -> IdentityStore {
    IdentityStore::new(pool.clone())
}

pub fn membership(pool: &DbPool) -> MembershipEngine {
    MembershipEngine::new(pool.clone(), null_sink())
}

pub fn invites(pool: &DbPool) -> InviteEngine {
    InviteEngine::new(pool.clone())
}

pub fn relationships(pool: &DbPool) -> RelationshipEngine {
    RelationshipEngine::new(pool.clone(), null_sink())
}

pub fn messaging(pool: &DbPool) -> MessagingEngine {
    MessagingEngine::new(pool.clone(), null_sink())
}

/// Create a fixture user with a unique username/email.
pub async fn new_user(store: &IdentityStore, tag: &str) -> UserRow {
    let name = unique(tag);
    store
        .create_user(&name, &format!("{name}@example.com"), Some(tag))
        .await
        .expect("fixture user")
}

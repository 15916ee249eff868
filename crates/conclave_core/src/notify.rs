//! Notification sink boundary.
//!
//! State-changing operations emit notifications through a
//! [`NotificationSink`] after their transaction commits. Emission is
//! fire-and-forget: a sink failure is logged and never rolls back or fails
//! the triggering operation.

use crate::helpers::get_conn;
use crate::models::{NewNotification, NotificationRow};
use async_trait::async_trait;
use conclave_database::DbPool;
use conclave_database::schema::notifications;
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::prelude::*;
use tracing::instrument;

/// Accepts notification enqueue calls from the engines.
///
/// Implementations must not propagate failure to the caller; the triggering
/// state change has already committed by the time `enqueue` runs.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Enqueue a notification for its recipient. Fire-and-forget.
    async fn enqueue(&self, notification: NewNotification);
}

/// Sink that persists notifications as rows on its own connection.
#[derive(Debug, Clone)]
pub struct DatabaseNotificationSink {
    pool: DbPool,
}

impl DatabaseNotificationSink {
    /// Create a sink writing through the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for DatabaseNotificationSink {
    async fn enqueue(&self, notification: NewNotification) {
        let result = get_conn(&self.pool).and_then(|mut conn| {
            diesel::insert_into(notifications::table)
                .values(&notification)
                .execute(&mut conn)
                .map_err(CoreError::from)
        });
        match result {
            Ok(_) => tracing::debug!(
                user_id = notification.user_id,
                kind = %notification.notification_type,
                "Notification enqueued"
            ),
            // Best-effort delivery: the primary state change stands.
            Err(e) => tracing::warn!(
                user_id = notification.user_id,
                error = %e,
                "Failed to enqueue notification"
            ),
        }
    }
}

/// Sink that drops every notification. Useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotificationSink;

#[async_trait]
impl NotificationSink for NullNotificationSink {
    async fn enqueue(&self, notification: NewNotification) {
        tracing::trace!(
            user_id = notification.user_id,
            kind = %notification.notification_type,
            "Notification dropped (null sink)"
        );
    }
}

/// Read-side queries over persisted notifications.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    pool: DbPool,
}

impl NotificationStore {
    /// Create a store reading through the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Unread notifications for the user, newest first.
    #[instrument(skip(self))]
    pub async fn unread(&self, user_id: i64) -> CoreResult<Vec<NotificationRow>> {
        let mut conn = get_conn(&self.pool)?;
        let rows = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false))
            .order(notifications::created_at.desc())
            .select(NotificationRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Mark one of the actor's notifications as read.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, actor_id: i64, notification_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        let updated = diesel::update(
            notifications::table
                .find(notification_id)
                .filter(notifications::user_id.eq(actor_id)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(CoreError::new(CoreErrorKind::NotificationNotFound(
                notification_id,
            )));
        }
        Ok(())
    }
}

//! Relationship engine.
//!
//! Friend requests, friendships, and blocks. A friendship is two directed
//! edges created atomically in the accepting transaction; a block in either
//! direction forbids new requests and tears down any existing
//! friendship/pending request between the pair.

use crate::helpers::{get_conn, user_exists};
use crate::models::{
    BlockedUserRow, FriendRequestRow, NewBlockedUser, NewFriend, NewFriendRequest,
    NewNotificationBuilder, NotificationType, RequestStatus, UserRow,
};
use crate::notify::NotificationSink;
use conclave_database::DbPool;
use conclave_database::schema::{blocked_users, friend_requests, friends, notifications, users};
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::instrument;

/// Friend-graph and block operations.
#[derive(Clone)]
pub struct RelationshipEngine {
    pool: DbPool,
    sink: Arc<dyn NotificationSink>,
}

impl RelationshipEngine {
    /// Create the engine over a pool and a notification sink.
    pub fn new(pool: DbPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Send a friend request from `sender_id` to `receiver_id`.
    ///
    /// Rejected when the pair is already friends, a pending request exists
    /// in either direction, or a block exists in either direction. A
    /// terminal request row for the same ordered pair is replaced by the
    /// fresh pending one (terminal rows never transition; replacement keeps
    /// the unique-pair constraint intact).
    #[instrument(skip(self))]
    pub async fn send_friend_request(
        &self,
        sender_id: i64,
        receiver_id: i64,
    ) -> CoreResult<FriendRequestRow> {
        if sender_id == receiver_id {
            return Err(CoreError::new(CoreErrorKind::SelfTarget(
                "send_friend_request",
            )));
        }
        let mut conn = get_conn(&self.pool)?;
        let request = conn.transaction::<FriendRequestRow, CoreError, _>(|conn| {
            if !user_exists(conn, receiver_id)? {
                return Err(CoreError::new(CoreErrorKind::UserNotFound(receiver_id)));
            }
            if friendship_exists(conn, sender_id, receiver_id)? {
                return Err(CoreError::new(CoreErrorKind::AlreadyFriends {
                    user_id: sender_id,
                    other_id: receiver_id,
                }));
            }
            if let Some(pending) = pending_between(conn, sender_id, receiver_id)? {
                return Err(CoreError::new(CoreErrorKind::RequestAlreadyPending(
                    pending.id,
                )));
            }
            if block_exists(conn, sender_id, receiver_id)? {
                return Err(CoreError::new(CoreErrorKind::Blocked {
                    user_id: sender_id,
                    other_id: receiver_id,
                }));
            }

            // A resolved (terminal) request for this ordered pair gives way
            // to the new one; its status never transitions. Notifications
            // still pointing at it go first.
            let stale: Option<i64> = friend_requests::table
                .filter(friend_requests::sender_id.eq(sender_id))
                .filter(friend_requests::receiver_id.eq(receiver_id))
                .select(friend_requests::id)
                .first(conn)
                .optional()?;
            if let Some(stale_id) = stale {
                diesel::delete(
                    notifications::table.filter(notifications::friend_request_id.eq(stale_id)),
                )
                .execute(conn)?;
                diesel::delete(friend_requests::table.find(stale_id)).execute(conn)?;
            }

            // Unique (sender, receiver) is the backstop for a concurrent
            // duplicate send; the violation surfaces as a Conflict.
            let row = diesel::insert_into(friend_requests::table)
                .values(&NewFriendRequest {
                    sender_id,
                    receiver_id,
                })
                .returning(FriendRequestRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;
        tracing::info!(request_id = request.id, sender_id, receiver_id, "Friend request sent");

        let notification = NewNotificationBuilder::default()
            .user_id(receiver_id)
            .notification_type(NotificationType::FriendRequest)
            .title("New friend request")
            .content(format!("User {sender_id} sent you a friend request"))
            .friend_request_id(Some(request.id))
            .build();
        if let Ok(n) = notification {
            self.sink.enqueue(n).await;
        }
        Ok(request)
    }

    /// Accept a pending friend request. Receiver only.
    ///
    /// The status transition and both symmetric friend edges commit in one
    /// transaction; one edge never exists without the other.
    #[instrument(skip(self))]
    pub async fn accept_friend_request(
        &self,
        actor_id: i64,
        request_id: i64,
    ) -> CoreResult<FriendRequestRow> {
        let mut conn = get_conn(&self.pool)?;
        let request = conn.transaction::<FriendRequestRow, CoreError, _>(|conn| {
            let request = find_request(conn, request_id)?;
            if request.receiver_id != actor_id {
                return Err(CoreError::new(CoreErrorKind::NotRequestReceiver(request_id)));
            }
            if request.status().is_terminal() {
                return Err(CoreError::new(CoreErrorKind::RequestNotPending {
                    status: request.status().to_string(),
                }));
            }
            let updated = diesel::update(friend_requests::table.find(request_id))
                .set((
                    friend_requests::status.eq(RequestStatus::Accepted),
                    friend_requests::updated_at.eq(diesel::dsl::now),
                ))
                .returning(FriendRequestRow::as_returning())
                .get_result(conn)?;

            diesel::insert_into(friends::table)
                .values(vec![
                    NewFriend {
                        user_id: request.sender_id,
                        friend_id: request.receiver_id,
                    },
                    NewFriend {
                        user_id: request.receiver_id,
                        friend_id: request.sender_id,
                    },
                ])
                .execute(conn)?;
            Ok(updated)
        })?;
        tracing::info!(request_id, "Friend request accepted");

        let notification = NewNotificationBuilder::default()
            .user_id(request.sender_id)
            .notification_type(NotificationType::FriendRequest)
            .title("Friend request accepted")
            .content(format!("User {} accepted your friend request", actor_id))
            .friend_request_id(Some(request.id))
            .build();
        if let Ok(n) = notification {
            self.sink.enqueue(n).await;
        }
        Ok(request)
    }

    /// Reject a pending friend request. Receiver only. `rejected` is
    /// terminal: no further transitions are permitted from it.
    #[instrument(skip(self))]
    pub async fn reject_friend_request(
        &self,
        actor_id: i64,
        request_id: i64,
    ) -> CoreResult<FriendRequestRow> {
        let mut conn = get_conn(&self.pool)?;
        let request = conn.transaction::<FriendRequestRow, CoreError, _>(|conn| {
            let request = find_request(conn, request_id)?;
            if request.receiver_id != actor_id {
                return Err(CoreError::new(CoreErrorKind::NotRequestReceiver(request_id)));
            }
            if request.status().is_terminal() {
                return Err(CoreError::new(CoreErrorKind::RequestNotPending {
                    status: request.status().to_string(),
                }));
            }
            let updated = diesel::update(friend_requests::table.find(request_id))
                .set((
                    friend_requests::status.eq(RequestStatus::Rejected),
                    friend_requests::updated_at.eq(diesel::dsl::now),
                ))
                .returning(FriendRequestRow::as_returning())
                .get_result(conn)?;
            Ok(updated)
        })?;
        tracing::info!(request_id, "Friend request rejected");
        Ok(request)
    }

    /// Remove a friendship: both directed edges go atomically.
    #[instrument(skip(self))]
    pub async fn remove_friend(&self, actor_id: i64, friend_id: i64) -> CoreResult<()> {
        if actor_id == friend_id {
            return Err(CoreError::new(CoreErrorKind::SelfTarget("remove_friend")));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            let deleted = delete_friend_edges(conn, actor_id, friend_id)?;
            if deleted == 0 {
                return Err(CoreError::new(CoreErrorKind::NotFriends {
                    user_id: actor_id,
                    friend_id,
                }));
            }
            Ok(())
        })?;
        tracing::info!(actor_id, friend_id, "Friendship removed");
        Ok(())
    }

    /// Block a user.
    ///
    /// Tears down any friendship between the pair, rejects any pending
    /// request in either direction, then records the directed block edge.
    /// Blocking is independent per direction.
    #[instrument(skip(self))]
    pub async fn block_user(&self, actor_id: i64, target_id: i64) -> CoreResult<()> {
        if actor_id == target_id {
            return Err(CoreError::new(CoreErrorKind::SelfTarget("block_user")));
        }
        let mut conn = get_conn(&self.pool)?;
        conn.transaction::<(), CoreError, _>(|conn| {
            if !user_exists(conn, target_id)? {
                return Err(CoreError::new(CoreErrorKind::UserNotFound(target_id)));
            }
            if block_edge_exists(conn, actor_id, target_id)? {
                return Err(CoreError::new(CoreErrorKind::AlreadyBlocked {
                    blocker_id: actor_id,
                    blocked_id: target_id,
                }));
            }

            delete_friend_edges(conn, actor_id, target_id)?;
            diesel::update(
                friend_requests::table
                    .filter(pair_filter(actor_id, target_id))
                    .filter(friend_requests::status.eq(RequestStatus::Pending)),
            )
            .set((
                friend_requests::status.eq(RequestStatus::Rejected),
                friend_requests::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;

            diesel::insert_into(blocked_users::table)
                .values(&NewBlockedUser {
                    blocker_id: actor_id,
                    blocked_id: target_id,
                })
                .execute(conn)
                .map_err(|e| match CoreError::from(e) {
                    e if matches!(e.kind, CoreErrorKind::UniqueViolation(_)) => {
                        CoreError::new(CoreErrorKind::AlreadyBlocked {
                            blocker_id: actor_id,
                            blocked_id: target_id,
                        })
                    }
                    e => e,
                })?;
            Ok(())
        })?;
        tracing::info!(actor_id, target_id, "User blocked");
        Ok(())
    }

    /// Remove the actor's block edge on `target_id`. The reverse edge, if
    /// any, is untouched.
    #[instrument(skip(self))]
    pub async fn unblock_user(&self, actor_id: i64, target_id: i64) -> CoreResult<()> {
        let mut conn = get_conn(&self.pool)?;
        let deleted = diesel::delete(
            blocked_users::table
                .filter(blocked_users::blocker_id.eq(actor_id))
                .filter(blocked_users::blocked_id.eq(target_id)),
        )
        .execute(&mut conn)?;
        if deleted == 0 {
            return Err(CoreError::new(CoreErrorKind::BlockNotFound {
                blocker_id: actor_id,
                blocked_id: target_id,
            }));
        }
        tracing::info!(actor_id, target_id, "User unblocked");
        Ok(())
    }

    /// The actor's friends, as user rows.
    #[instrument(skip(self))]
    pub async fn list_friends(&self, actor_id: i64) -> CoreResult<Vec<UserRow>> {
        let mut conn = get_conn(&self.pool)?;
        let rows = friends::table
            .filter(friends::user_id.eq(actor_id))
            .inner_join(users::table.on(users::id.eq(friends::friend_id)))
            .order(users::username.asc())
            .select(UserRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// The block edges the actor has created, newest first.
    #[instrument(skip(self))]
    pub async fn blocked_users(&self, actor_id: i64) -> CoreResult<Vec<BlockedUserRow>> {
        let mut conn = get_conn(&self.pool)?;
        let rows = blocked_users::table
            .filter(blocked_users::blocker_id.eq(actor_id))
            .order(blocked_users::created_at.desc())
            .select(BlockedUserRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Pending requests addressed to the actor, oldest first.
    #[instrument(skip(self))]
    pub async fn pending_requests(&self, actor_id: i64) -> CoreResult<Vec<FriendRequestRow>> {
        let mut conn = get_conn(&self.pool)?;
        let rows = friend_requests::table
            .filter(friend_requests::receiver_id.eq(actor_id))
            .filter(friend_requests::status.eq(RequestStatus::Pending))
            .order(friend_requests::created_at.asc())
            .select(FriendRequestRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }
}

/// Whether an accepted friendship exists between the pair. Checks both
/// directed edges.
pub(crate) fn friendship_exists(
    conn: &mut PgConnection,
    a: i64,
    b: i64,
) -> CoreResult<bool> {
    use diesel::dsl::{exists, select};
    let present = select(exists(
        friends::table.filter(
            friends::user_id
                .eq(a)
                .and(friends::friend_id.eq(b))
                .or(friends::user_id.eq(b).and(friends::friend_id.eq(a))),
        ),
    ))
    .get_result(conn)?;
    Ok(present)
}

/// Whether a block edge exists in either direction between the pair.
pub(crate) fn block_exists(conn: &mut PgConnection, a: i64, b: i64) -> CoreResult<bool> {
    use diesel::dsl::{exists, select};
    let present = select(exists(
        blocked_users::table.filter(
            blocked_users::blocker_id
                .eq(a)
                .and(blocked_users::blocked_id.eq(b))
                .or(blocked_users::blocker_id
                    .eq(b)
                    .and(blocked_users::blocked_id.eq(a))),
        ),
    ))
    .get_result(conn)?;
    Ok(present)
}

fn block_edge_exists(conn: &mut PgConnection, blocker: i64, blocked: i64) -> CoreResult<bool> {
    use diesel::dsl::{exists, select};
    let present = select(exists(
        blocked_users::table
            .filter(blocked_users::blocker_id.eq(blocker))
            .filter(blocked_users::blocked_id.eq(blocked)),
    ))
    .get_result(conn)?;
    Ok(present)
}

fn pending_between(
    conn: &mut PgConnection,
    a: i64,
    b: i64,
) -> CoreResult<Option<FriendRequestRow>> {
    let row = friend_requests::table
        .filter(pair_filter(a, b))
        .filter(friend_requests::status.eq(RequestStatus::Pending))
        .select(FriendRequestRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row)
}

/// Boxed filter matching requests between the pair, either direction.
fn pair_filter(
    a: i64,
    b: i64,
) -> Box<
    dyn BoxableExpression<friend_requests::table, diesel::pg::Pg, SqlType = diesel::sql_types::Bool>,
> {
    Box::new(
        friend_requests::sender_id
            .eq(a)
            .and(friend_requests::receiver_id.eq(b))
            .or(friend_requests::sender_id
                .eq(b)
                .and(friend_requests::receiver_id.eq(a))),
    )
}

fn find_request(conn: &mut PgConnection, request_id: i64) -> CoreResult<FriendRequestRow> {
    friend_requests::table
        .find(request_id)
        .select(FriendRequestRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| CoreError::new(CoreErrorKind::RequestNotFound(request_id)))
}

fn delete_friend_edges(conn: &mut PgConnection, a: i64, b: i64) -> CoreResult<usize> {
    let deleted = diesel::delete(
        friends::table.filter(
            friends::user_id
                .eq(a)
                .and(friends::friend_id.eq(b))
                .or(friends::user_id.eq(b).and(friends::friend_id.eq(a))),
        ),
    )
    .execute(conn)?;
    Ok(deleted)
}

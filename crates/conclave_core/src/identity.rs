//! Identity store.
//!
//! Users are opaque to the rest of the core beyond identity and profile
//! fields. Username and email are immutable once created; profile fields
//! stay mutable.

use crate::helpers::{find_user, get_conn, user_exists};
use crate::models::{NewUser, UserRow};
use conclave_database::DbPool;
use conclave_database::schema::users;
use conclave_error::{CoreError, CoreErrorKind, CoreResult};
use diesel::prelude::*;
use tracing::instrument;

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name, if changing.
    pub display_name: Option<String>,
    /// New avatar URL, if changing.
    pub avatar: Option<String>,
    /// New bio, if changing.
    pub bio: Option<String>,
}

/// User identity and profile operations.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    pool: DbPool,
}

impl IdentityStore {
    /// Create an identity store over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty username or a malformed email
    /// - `UsernameTaken` / `EmailTaken` when the identity already exists
    #[instrument(skip(self))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> CoreResult<UserRow> {
        if username.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(
                "username must not be empty".to_string(),
            )));
        }
        if !email.contains('@') {
            return Err(CoreError::new(CoreErrorKind::InvalidArgument(format!(
                "malformed email: {email}"
            ))));
        }

        let mut conn = get_conn(&self.pool)?;
        let row = conn.transaction::<UserRow, CoreError, _>(|conn| {
            use diesel::dsl::{exists, select};
            let username_taken: bool =
                select(exists(users::table.filter(users::username.eq(username))))
                    .get_result(conn)?;
            if username_taken {
                return Err(CoreError::new(CoreErrorKind::UsernameTaken(
                    username.to_string(),
                )));
            }
            let email_taken: bool =
                select(exists(users::table.filter(users::email.eq(email)))).get_result(conn)?;
            if email_taken {
                return Err(CoreError::new(CoreErrorKind::EmailTaken(email.to_string())));
            }

            let new_user = NewUser {
                username: username.to_string(),
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
            };
            let row = diesel::insert_into(users::table)
                .values(&new_user)
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;

        tracing::info!(user_id = row.id, "User created");
        Ok(row)
    }

    /// Fetch a user by id.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i64) -> CoreResult<UserRow> {
        let mut conn = get_conn(&self.pool)?;
        find_user(&mut conn, user_id)
    }

    /// Whether a user with this id exists.
    #[instrument(skip(self))]
    pub async fn user_exists(&self, user_id: i64) -> CoreResult<bool> {
        let mut conn = get_conn(&self.pool)?;
        user_exists(&mut conn, user_id)
    }

    /// Update the actor's own profile fields.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, actor_id: i64, changes: ProfileUpdate) -> CoreResult<UserRow> {
        let mut conn = get_conn(&self.pool)?;
        let row = conn.transaction::<UserRow, CoreError, _>(|conn| {
            find_user(conn, actor_id)?;
            let row = diesel::update(users::table.find(actor_id))
                .set((
                    changes.display_name.map(|v| users::display_name.eq(v)),
                    changes.avatar.map(|v| users::avatar.eq(v)),
                    changes.bio.map(|v| users::bio.eq(v)),
                    users::updated_at.eq(diesel::dsl::now),
                ))
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;
        Ok(row)
    }
}

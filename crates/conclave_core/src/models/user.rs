//! User identity models.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the users table.
///
/// Identity fields (`username`, `email`) are immutable once created; profile
/// fields (`display_name`, `avatar`, `bio`) are mutable through the identity
/// store.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// User ID
    pub id: i64,
    username: String,
    email: String,
    display_name: Option<String>,
    avatar: Option<String>,
    bio: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable struct for the users table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::users)]
pub struct NewUser {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) display_name: Option<String>,
}

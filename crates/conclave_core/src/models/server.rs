//! Server (guild) models.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the servers table.
///
/// A server has exactly one owner, who also holds a membership row with the
/// `owner` coarse role for as long as ownership stands.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, serde::Serialize, derive_getters::Getters)]
#[diesel(table_name = conclave_database::schema::servers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServerRow {
    /// Server ID
    pub id: i64,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    /// Owning user ID
    pub owner_id: i64,
    is_public: bool,
    invite_code: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable struct for the servers table.
#[derive(Debug, Clone, Insertable, derive_getters::Getters, derive_builder::Builder)]
#[diesel(table_name = conclave_database::schema::servers)]
#[builder(setter(into))]
pub struct NewServer {
    pub(crate) name: String,
    #[builder(default)]
    pub(crate) description: Option<String>,
    #[builder(default)]
    pub(crate) icon: Option<String>,
    pub(crate) owner_id: i64,
    #[builder(default)]
    pub(crate) is_public: bool,
    #[builder(default)]
    pub(crate) invite_code: Option<String>,
}

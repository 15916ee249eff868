//! Database connection error types.

/// Kinds of database connection errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Connection to the database failed
    #[display("Database connection error: {}", _0)]
    Connection(String),
    /// Pool checkout failed
    #[display("Connection pool error: {}", _0)]
    Pool(String),
    /// Migration run failed
    #[display("Migration error: {}", _0)]
    Migration(String),
}

/// Database error with source location tracking.
#[derive(Debug, Clone, derive_more::Display)]
#[display("Database Error: {} at line {} in {}", kind, line, file)]
pub struct DatabaseError {
    /// The kind of error that occurred
    pub kind: DatabaseErrorKind,
    /// Line number where the error was created
    pub line: u32,
    /// File where the error was created
    pub file: &'static str,
}

impl DatabaseError {
    /// Create a new `DatabaseError` with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl std::error::Error for DatabaseError {}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

/// Result alias for database connection operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

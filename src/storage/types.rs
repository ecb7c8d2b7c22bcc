use thiserror::Error;

/// Errors opening the local state database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another quire process holds the database lock.
    #[error("Another instance of quire appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("State database migration failed: {0}")]
    Migration(String),

    #[error("State database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify lock contention (SQLITE_BUSY / SQLITE_LOCKED) separately.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let message = err.to_string().to_lowercase();
        if message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
            || message.contains("sqlite_locked")
        {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

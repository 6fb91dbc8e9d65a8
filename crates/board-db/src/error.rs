use rusqlite::ffi;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database name {0:?}")]
    InvalidName(String),

    #[error("failed to connect to database: {0}")]
    Connection(String),

    #[error("failed to execute SQL: {0}")]
    SqlExecution(rusqlite::Error),

    #[error("database migration failed: {0}")]
    Migration(String),

    #[error("database not connected")]
    NotConnected,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Store(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                DbError::DuplicateKey(msg.unwrap_or_else(|| e.to_string()))
            }
            other => DbError::Store(other),
        }
    }
}

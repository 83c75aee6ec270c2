use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event store query timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures a client may reasonably retry later: timeouts and
    /// connection-level database errors.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::StoreTimeout(_) => true,
            Error::Database(db_err) => is_transient_error(db_err),
            _ => false,
        }
    }
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => {
            // Connection-related SQLSTATE codes
            db_err.code().is_some_and(|code| {
                code == "08000" || // connection_exception
                code == "08003" || // connection_does_not_exist
                code == "08006" || // connection_failure
                code == "57P03" || // cannot_connect_now
                code == "53300" // too_many_connections
            })
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Registry error types.
//!
//! Lookups and deletes of a missing id are not errors; they surface as
//! `Ok(None)` and [`DeleteOutcome::NotFound`](crate::DeleteOutcome::NotFound).

use roster_core::retry::Retryable;
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The store is temporarily unable to serve (busy, locked, pool exhausted).
    #[error("registry temporarily unavailable: {message}")]
    Transient {
        /// Underlying cause.
        message: String,
    },

    /// The store cannot serve this invocation.
    #[error("registry unavailable: {message}")]
    Unavailable {
        /// Underlying cause.
        message: String,
    },

    /// A stored row could not be decoded.
    #[error("corrupt registry row for {connection_id}: {message}")]
    Corrupt {
        /// Key of the bad row.
        connection_id: String,
        /// What failed to decode.
        message: String,
    },

    /// Internal failure (e.g. a blocking task panicked).
    #[error("internal registry error: {0}")]
    Internal(String),
}

impl Retryable for RegistryError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                Self::Transient {
                    message: err.to_string(),
                }
            }
            _ => Self::Unavailable {
                message: err.to_string(),
            },
        }
    }
}

impl From<r2d2::Error> for RegistryError {
    fn from(err: r2d2::Error) -> Self {
        Self::Transient {
            message: format!("connection pool: {err}"),
        }
    }
}

/// Convenience type alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;

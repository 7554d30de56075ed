//! Push error classification.

use roster_core::retry::Retryable;
use thiserror::Error;

/// Why a single push did not land.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PushError {
    /// The target socket is no longer open.
    #[error("connection is gone")]
    Stale,

    /// Temporary refusal (rate limit, timeout, overloaded gateway).
    #[error("transient push failure: {message}")]
    Transient {
        /// Underlying cause.
        message: String,
        /// Server-requested wait before retrying, in ms.
        retry_after_ms: Option<u64>,
    },

    /// Permanent refusal that is not staleness (bad request, forbidden).
    #[error("push rejected: {message}")]
    Rejected {
        /// HTTP status, when there was one.
        status: Option<u16>,
        /// Underlying cause.
        message: String,
    },
}

impl PushError {
    /// Transient failure without a retry hint.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Transient { .. } => "transient",
            Self::Rejected { .. } => "rejected",
        }
    }
}

impl Retryable for PushError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Transient { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Convenience type alias for push results.
pub type Result<T> = std::result::Result<T, PushError>;

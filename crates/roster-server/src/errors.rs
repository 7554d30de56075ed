//! Disconnect and handler errors.

use std::fmt;

use roster_registry::RegistryError;
use thiserror::Error;

/// Step of a disconnect where a registry call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectPhase {
    /// Looking up the departing record.
    Lookup,
    /// Removing the departing record.
    Delete,
    /// Listing the remaining participants.
    Scan,
}

impl fmt::Display for DisconnectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lookup => "lookup",
            Self::Delete => "delete",
            Self::Scan => "scan",
        })
    }
}

/// Systemic failure of one disconnect. Per-recipient push failures never
/// appear here; they are counted in the report.
#[derive(Debug, Error)]
pub enum DisconnectError {
    /// The registry failed during `phase`.
    #[error("registry {phase} failed: {source}")]
    Registry {
        /// Where it failed.
        phase: DisconnectPhase,
        /// Underlying error.
        #[source]
        source: RegistryError,
    },

    /// The departure event could not be serialized.
    #[error("failed to encode departure event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DisconnectError {
    pub(crate) fn registry(phase: DisconnectPhase) -> impl FnOnce(RegistryError) -> Self {
        move |source| Self::Registry { phase, source }
    }
}

/// Why the handler returned a non-200 response.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The inbound event carried no `requestContext.connectionId`.
    #[error("malformed disconnect event: {0}")]
    MalformedEvent(String),

    /// The disconnect failed.
    #[error(transparent)]
    Disconnect(#[from] DisconnectError),

    /// The wall-clock budget ran out.
    #[error("disconnect timed out after {timeout_ms}ms")]
    TimedOut {
        /// Budget that was exceeded.
        timeout_ms: u64,
    },
}

impl HandlerError {
    /// HTTP-style status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedEvent(_) => 400,
            Self::Disconnect(DisconnectError::Registry {
                source: RegistryError::Unavailable { .. } | RegistryError::Transient { .. },
                ..
            }) => 503,
            Self::TimedOut { .. } => 504,
            Self::Disconnect(_) => 500,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self.status_code() {
            400 => "malformed",
            503 => "unavailable",
            504 => "timeout",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_err(source: RegistryError) -> HandlerError {
        HandlerError::Disconnect(DisconnectError::Registry {
            phase: DisconnectPhase::Delete,
            source,
        })
    }

    #[test]
    fn status_codes() {
        assert_eq!(HandlerError::MalformedEvent("x".into()).status_code(), 400);
        assert_eq!(
            registry_err(RegistryError::Unavailable {
                message: "down".into()
            })
            .status_code(),
            503
        );
        assert_eq!(HandlerError::TimedOut { timeout_ms: 10 }.status_code(), 504);
        assert_eq!(
            registry_err(RegistryError::Internal("panic".into())).status_code(),
            500
        );
    }

    #[test]
    fn message_names_phase() {
        let err = registry_err(RegistryError::Unavailable {
            message: "disk I/O error".into(),
        });
        assert_eq!(
            err.to_string(),
            "registry delete failed: registry unavailable: disk I/O error"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(HandlerError::TimedOut { timeout_ms: 1 }.kind(), "timeout");
        assert_eq!(HandlerError::MalformedEvent(String::new()).kind(), "malformed");
    }
}

//! Bounded push retry.

use std::sync::Arc;

use roster_core::ConnectionId;
use roster_core::retry::{RetryConfig, retry_with_backoff};
use tracing::debug;

use crate::errors::PushError;
use crate::traits::GatewayPush;

/// Counter of push retries (attempts after the first).
pub const PUSH_RETRIES_TOTAL: &str = "roster_push_retries_total";

/// Final result of pushing to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The gateway accepted the payload.
    Delivered {
        /// Attempts used (1-based).
        attempts: u32,
    },
    /// The recipient's socket is gone.
    Stale,
    /// Rejected, or transient on every allowed attempt.
    Failed {
        /// Last error seen.
        reason: PushError,
        /// Attempts used (1-based).
        attempts: u32,
    },
}

impl PushOutcome {
    /// Whether the payload was delivered.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Push with retry of transient failures, never returning an error.
pub async fn push_with_retry(
    gateway: &dyn GatewayPush,
    config: &RetryConfig,
    connection_id: &ConnectionId,
    payload: Arc<String>,
) -> PushOutcome {
    let result = retry_with_backoff(config, "gateway.push", || {
        gateway.push(connection_id, Arc::clone(&payload))
    })
    .await;

    let retries = result.retries();
    if retries > 0 {
        metrics::counter!(PUSH_RETRIES_TOTAL).increment(u64::from(retries));
        debug!(
            connection_id = %connection_id,
            retries,
            waited_ms = result.total_delay_ms,
            "push retried"
        );
    }

    match result.outcome {
        Ok(()) => PushOutcome::Delivered {
            attempts: result.attempts,
        },
        Err(PushError::Stale) => PushOutcome::Stale,
        Err(reason) => {
            debug!(
                connection_id = %connection_id,
                attempts = result.attempts,
                error = %reason,
                "push failed"
            );
            PushOutcome::Failed {
                reason,
                attempts: result.attempts,
            }
        }
    }
}

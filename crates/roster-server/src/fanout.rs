//! Departure fan-out to every remaining participant.

use std::sync::Arc;

use futures::StreamExt;
use roster_core::retry::RetryConfig;
use roster_core::{ConnectionId, DisconnectEvent};
use roster_gateway::{GatewayPush, PushError, PushOutcome, push_with_retry};
use tracing::{debug, warn};

use crate::metrics::PUSHES_TOTAL;

/// Default number of pushes in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Aggregate result of one broadcast.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Recipients that received the payload.
    pub delivered: usize,
    /// Recipients whose socket was gone.
    pub stale: Vec<ConnectionId>,
    /// Recipients that failed for any other reason.
    pub failed: Vec<(ConnectionId, PushError)>,
}

impl FanoutReport {
    /// Number of recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.stale.len() + self.failed.len()
    }
}

/// Pushes one event to many recipients with bounded parallelism.
#[derive(Clone)]
pub struct Fanout {
    gateway: Arc<dyn GatewayPush>,
    retry: RetryConfig,
    concurrency: usize,
}

impl Fanout {
    /// Build a fan-out over `gateway`.
    pub fn new(gateway: Arc<dyn GatewayPush>, retry: RetryConfig, concurrency: usize) -> Self {
        Self {
            gateway,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Push `event` to every recipient except its own connection.
    ///
    /// Every recipient is attempted; one failure never stops the others.
    pub async fn broadcast(
        &self,
        event: &DisconnectEvent,
        recipients: Vec<ConnectionId>,
    ) -> serde_json::Result<FanoutReport> {
        let payload = event.to_payload()?;
        let origin = &event.connection_id;
        let gateway = self.gateway.as_ref();
        let retry = &self.retry;

        let recipients: Vec<ConnectionId> =
            recipients.into_iter().filter(|id| id != origin).collect();
        debug!(recipients = recipients.len(), "fan-out starting");

        let mut results = futures::stream::iter(recipients)
            .map(|id| {
                let payload = Arc::clone(&payload);
                async move {
                    let outcome = push_with_retry(gateway, retry, &id, payload).await;
                    (id, outcome)
                }
            })
            .buffer_unordered(self.concurrency);

        let mut report = FanoutReport::default();
        while let Some((id, outcome)) = results.next().await {
            match outcome {
                PushOutcome::Delivered { .. } => {
                    metrics::counter!(PUSHES_TOTAL, "result" => "delivered").increment(1);
                    report.delivered += 1;
                }
                PushOutcome::Stale => {
                    metrics::counter!(PUSHES_TOTAL, "result" => "stale").increment(1);
                    debug!(recipient = %id, "recipient is stale, skipped");
                    report.stale.push(id);
                }
                PushOutcome::Failed { reason, attempts } => {
                    metrics::counter!(PUSHES_TOTAL, "result" => "failed").increment(1);
                    warn!(recipient = %id, attempts, error = %reason, "push failed, skipped");
                    report.failed.push((id, reason));
                }
            }
        }
        Ok(report)
    }
}

//! Per-connection disconnect: lookup, delete, then tell everyone else.

use std::sync::Arc;

use futures::TryStreamExt;
use roster_core::{ConnectionId, DisconnectEvent};
use roster_registry::{ConnectionRegistry, DeleteOutcome, scan};
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::errors::{DisconnectError, DisconnectPhase};
use crate::fanout::{Fanout, FanoutReport};
use crate::metrics::STALE_PRUNED_TOTAL;

/// Tunables for the coordinator.
#[derive(Clone, Debug)]
pub struct DisconnectConfig {
    /// Records fetched per registry scan page.
    pub scan_page_size: usize,
    /// Delete recipients found stale during the fan-out.
    pub prune_stale: bool,
}

impl Default for DisconnectConfig {
    fn default() -> Self {
        Self {
            scan_page_size: 100,
            prune_stale: true,
        }
    }
}

/// What happened to the departing connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DisconnectOutcome {
    /// The record was removed by this invocation and the departure broadcast.
    #[serde(rename_all = "camelCase")]
    Departed {
        /// Name carried in the departure event.
        user_name: String,
    },
    /// Nothing to do: the record was already gone.
    AlreadyGone,
}

/// Summary of one disconnect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectReport {
    /// The departing connection.
    pub connection_id: ConnectionId,
    /// Whether this invocation performed the departure.
    pub outcome: DisconnectOutcome,
    /// Recipients that received the event.
    pub delivered: usize,
    /// Recipients whose sockets were gone.
    pub stale: usize,
    /// Recipients that could not be reached.
    pub failed: usize,
    /// Stale recipients removed from the registry afterwards.
    pub pruned: usize,
}

impl DisconnectReport {
    fn already_gone(connection_id: &ConnectionId) -> Self {
        Self {
            connection_id: connection_id.clone(),
            outcome: DisconnectOutcome::AlreadyGone,
            delivered: 0,
            stale: 0,
            failed: 0,
            pruned: 0,
        }
    }

    /// Total pushes attempted.
    pub fn pushes(&self) -> usize {
        self.delivered + self.stale + self.failed
    }
}

/// Runs the disconnect state machine against a registry and a fan-out.
///
/// Invocations for different ids share nothing but the registry. Two
/// invocations for the same id race on `delete`; exactly one sees
/// [`DeleteOutcome::Deleted`] and broadcasts.
pub struct DisconnectCoordinator {
    registry: Arc<dyn ConnectionRegistry>,
    fanout: Fanout,
    config: DisconnectConfig,
}

impl DisconnectCoordinator {
    /// Create a coordinator.
    pub fn new(registry: Arc<dyn ConnectionRegistry>, fanout: Fanout, config: DisconnectConfig) -> Self {
        Self {
            registry,
            fanout,
            config,
        }
    }

    /// The registry this coordinator mutates.
    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Process one disconnect.
    ///
    /// Push failures are absorbed into the report; only registry failures
    /// and encoding errors are returned.
    pub async fn handle(&self, connection_id: &ConnectionId) -> Result<DisconnectReport, DisconnectError> {
        let span = info_span!("disconnect", connection_id = %connection_id);
        self.run(connection_id).instrument(span).await
    }

    async fn run(&self, connection_id: &ConnectionId) -> Result<DisconnectReport, DisconnectError> {
        let Some(record) = self
            .registry
            .get(connection_id)
            .await
            .map_err(DisconnectError::registry(DisconnectPhase::Lookup))?
        else {
            info!("connection already cleaned up");
            return Ok(DisconnectReport::already_gone(connection_id));
        };

        let deleted = self
            .registry
            .delete(connection_id)
            .await
            .map_err(DisconnectError::registry(DisconnectPhase::Delete))?;
        if deleted == DeleteOutcome::NotFound {
            info!("record removed concurrently, leaving broadcast to the other invocation");
            return Ok(DisconnectReport::already_gone(connection_id));
        }

        let event = DisconnectEvent::from_record(&record);
        let recipients: Vec<ConnectionId> = scan(self.registry.as_ref(), self.config.scan_page_size)
            .map_ok(|r| r.connection_id)
            .try_filter(|id| futures::future::ready(id != connection_id))
            .try_collect()
            .await
            .map_err(DisconnectError::registry(DisconnectPhase::Scan))?;

        let report = self.fanout.broadcast(&event, recipients).await?;
        let pruned = if self.config.prune_stale {
            self.prune(&report).await
        } else {
            0
        };

        info!(
            user_name = %record.user_name,
            delivered = report.delivered,
            stale = report.stale.len(),
            failed = report.failed.len(),
            pruned,
            "departure broadcast"
        );

        Ok(DisconnectReport {
            connection_id: connection_id.clone(),
            outcome: DisconnectOutcome::Departed {
                user_name: record.user_name,
            },
            delivered: report.delivered,
            stale: report.stale.len(),
            failed: report.failed.len(),
            pruned,
        })
    }

    /// Best-effort removal of recipients whose sockets were gone.
    async fn prune(&self, report: &FanoutReport) -> usize {
        let mut pruned = 0;
        for id in &report.stale {
            match self.registry.delete(id).await {
                Ok(DeleteOutcome::Deleted) => {
                    debug!(recipient = %id, "pruned stale connection");
                    pruned += 1;
                }
                Ok(DeleteOutcome::NotFound) => {}
                Err(err) => warn!(recipient = %id, error = %err, "failed to prune stale connection"),
            }
        }
        if pruned > 0 {
            metrics::counter!(STALE_PRUNED_TOTAL).increment(u64::try_from(pruned).unwrap_or(u64::MAX));
        }
        pruned
    }
}

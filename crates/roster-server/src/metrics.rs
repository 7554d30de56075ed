//! Prometheus metrics recorder and `/metrics` endpoint support.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

pub use roster_gateway::retry::PUSH_RETRIES_TOTAL;
pub use roster_registry::retrying::REGISTRY_RETRIES_TOTAL;

/// Disconnect invocations (counter, labels: outcome).
pub const DISCONNECTS_TOTAL: &str = "roster_disconnects_total";
/// Individual push results (counter, labels: result).
pub const PUSHES_TOTAL: &str = "roster_pushes_total";
/// Stale recipients removed from the registry after a fan-out (counter).
pub const STALE_PRUNED_TOTAL: &str = "roster_stale_pruned_total";
/// Wall-clock time of one disconnect invocation (histogram).
pub const HANDLER_DURATION_SECONDS: &str = "roster_handler_duration_seconds";
/// Sockets currently attached to the in-process gateway (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "roster_ws_connections_active";

/// Install the Prometheus recorder globally.
///
/// Returns the handle used to render `/metrics`. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

fn describe() {
    metrics::describe_counter!(DISCONNECTS_TOTAL, "Disconnect invocations by outcome");
    metrics::describe_counter!(PUSHES_TOTAL, "Departure pushes by result");
    metrics::describe_counter!(PUSH_RETRIES_TOTAL, "Push attempts after the first");
    metrics::describe_counter!(REGISTRY_RETRIES_TOTAL, "Registry attempts after the first");
    metrics::describe_counter!(STALE_PRUNED_TOTAL, "Stale recipients pruned from the registry");
    metrics::describe_histogram!(
        HANDLER_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Disconnect handler wall-clock time"
    );
    metrics::describe_gauge!(WS_CONNECTIONS_ACTIVE, "Sockets attached to the local gateway");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_names_are_prefixed_snake_case() {
        let names = [
            DISCONNECTS_TOTAL,
            PUSHES_TOTAL,
            PUSH_RETRIES_TOTAL,
            REGISTRY_RETRIES_TOTAL,
            STALE_PRUNED_TOTAL,
            HANDLER_DURATION_SECONDS,
            WS_CONNECTIONS_ACTIVE,
        ];
        for name in names {
            assert!(name.starts_with("roster_"), "{name}");
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name}"
            );
        }
    }
}

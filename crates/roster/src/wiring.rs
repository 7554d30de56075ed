//! Builds the registry, gateway and handler for a resolved deployment.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use roster_gateway::{GatewayPush, HttpGatewayClient, LocalGateway};
use roster_registry::sqlite::ConnectionConfig;
use roster_registry::{ConnectionRegistry, InMemoryRegistry, RetryingRegistry, SqliteRegistry};
use roster_server::{DisconnectConfig, DisconnectCoordinator, DisconnectHandler, Fanout, ServerConfig};
use roster_settings::{Deployment, GatewayEndpoint, RegistryLocation, RegistrySettings, RosterSettings};
use tracing::warn;

/// How the process uses the services it builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Long-running server that owns the `/ws` sockets.
    Server,
    /// A single disconnect handled from the command line.
    OneShot,
}

/// Everything a server or one-shot invocation needs.
pub struct Services {
    /// Disconnect entry point.
    pub handler: Arc<DisconnectHandler>,
    /// Present when pushes go to this process's own sockets.
    pub local: Option<Arc<LocalGateway>>,
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Open the registry and wrap it with retry.
pub fn build_registry(
    location: &RegistryLocation,
    settings: &RegistrySettings,
) -> Result<Arc<dyn ConnectionRegistry>> {
    let inner: Arc<dyn ConnectionRegistry> = match location {
        RegistryLocation::Memory => Arc::new(InMemoryRegistry::new()),
        RegistryLocation::Sqlite(path) => {
            ensure_parent_dir(path)?;
            let config = ConnectionConfig {
                pool_size: settings.pool_size,
                busy_timeout_ms: settings.busy_timeout_ms,
            };
            let registry = SqliteRegistry::open(path, &config)
                .with_context(|| format!("Failed to open registry at {}", path.display()))?;
            Arc::new(registry)
        }
    };
    Ok(Arc::new(RetryingRegistry::new(inner, settings.retry.clone())))
}

/// Wire the full disconnect pipeline.
///
/// A one-shot run over the local gateway holds no sockets, so every push
/// comes back stale and pruning is turned off for it.
pub fn build_services(settings: &RosterSettings, deployment: &Deployment, role: Role) -> Result<Services> {
    let registry = build_registry(&deployment.registry, &settings.registry)?;

    let (gateway, local): (Arc<dyn GatewayPush>, Option<Arc<LocalGateway>>) = match &deployment.gateway {
        GatewayEndpoint::Local => {
            let local = Arc::new(LocalGateway::new());
            (local.clone(), Some(local))
        }
        GatewayEndpoint::Http(url) => {
            let client = HttpGatewayClient::new(
                url.clone(),
                Duration::from_millis(settings.gateway.request_timeout_ms),
            )
            .context("Failed to build gateway client")?;
            (Arc::new(client), None)
        }
    };

    let fanout = Fanout::new(
        gateway,
        settings.gateway.retry.clone(),
        settings.gateway.fanout_concurrency,
    );
    let mut disconnect = DisconnectConfig::from_settings(settings);
    if role == Role::OneShot && local.is_some() && disconnect.prune_stale {
        warn!("local gateway has no sockets in a one-shot run, stale pruning disabled");
        disconnect.prune_stale = false;
    }
    let coordinator = DisconnectCoordinator::new(registry, fanout, disconnect);
    let timeout = ServerConfig::from_settings(settings).handler_timeout();
    let handler = Arc::new(DisconnectHandler::new(Arc::new(coordinator), timeout));
    Ok(Services { handler, local })
}

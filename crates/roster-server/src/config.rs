//! Server configuration.

use std::time::Duration;

use roster_settings::RosterSettings;
use serde::{Deserialize, Serialize};

use crate::coordinator::DisconnectConfig;

/// Configuration for the HTTP + WebSocket server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Wall-clock budget for one disconnect, in ms.
    pub handler_timeout_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per attached socket.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            handler_timeout_ms: 30_000,
            max_message_size: 64 * 1024,
            channel_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Server section of the loaded settings.
    pub fn from_settings(settings: &RosterSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            handler_timeout_ms: settings.server.handler_timeout_ms,
            max_message_size: settings.server.max_message_size,
            channel_capacity: settings.gateway.channel_capacity.max(1),
        }
    }

    /// Handler budget as a `Duration`.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl DisconnectConfig {
    /// Coordinator section of the loaded settings.
    pub fn from_settings(settings: &RosterSettings) -> Self {
        Self {
            scan_page_size: settings.registry.scan_page_size.max(1),
            prune_stale: settings.gateway.prune_stale,
        }
    }
}

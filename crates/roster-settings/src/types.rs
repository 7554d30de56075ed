//! Settings types with compiled defaults.

use roster_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RosterSettings {
    /// Connection registry.
    pub registry: RegistrySettings,
    /// Gateway push client and fan-out.
    pub gateway: GatewaySettings,
    /// HTTP server and handler budget.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Connection registry settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrySettings {
    /// Registry location (`memory`, `sqlite:<path>`, or a file path). Required.
    pub location: Option<String>,
    /// Records fetched per scan page.
    pub scan_page_size: usize,
    /// SQLite connection pool size.
    pub pool_size: u32,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Retry policy for transient registry failures.
    pub retry: RetryConfig,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            location: None,
            scan_page_size: 100,
            pool_size: 8,
            busy_timeout_ms: 5_000,
            retry: RetryConfig::default(),
        }
    }
}

/// Gateway settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewaySettings {
    /// Management endpoint URL, or `local` for the in-process gateway. Required.
    pub endpoint: Option<String>,
    /// Per-push HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum pushes in flight during one fan-out.
    pub fanout_concurrency: usize,
    /// Delete registry entries whose push came back stale.
    pub prune_stale: bool,
    /// Outbound queue depth per local WebSocket connection.
    pub channel_capacity: usize,
    /// Retry policy for transient push failures.
    pub retry: RetryConfig,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: 5_000,
            fanout_concurrency: 16,
            prune_stale: true,
            channel_capacity: 64,
            retry: RetryConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Wall-clock budget for one disconnect invocation in milliseconds.
    pub handler_timeout_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9850,
            handler_timeout_ms: 30_000,
            max_message_size: 64 * 1024,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_values_default_to_none() {
        let s = RosterSettings::default();
        assert!(s.registry.location.is_none());
        assert!(s.gateway.endpoint.is_none());
    }

    #[test]
    fn default_fanout_values() {
        let s = GatewaySettings::default();
        assert_eq!(s.fanout_concurrency, 16);
        assert!(s.prune_stale);
        assert_eq!(s.retry.max_attempts, 3);
    }

    #[test]
    fn default_server_values() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.port, 9850);
        assert_eq!(s.handler_timeout_ms, 30_000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: RosterSettings =
            serde_json::from_str(r#"{"gateway":{"fanoutConcurrency":4}}"#).unwrap();
        assert_eq!(s.gateway.fanout_concurrency, 4);
        assert_eq!(s.gateway.request_timeout_ms, 5_000);
        assert_eq!(s.server, ServerSettings::default());
    }

    #[test]
    fn serde_roundtrip() {
        let mut s = RosterSettings::default();
        s.registry.location = Some("memory".into());
        s.logging.json = true;
        let json = serde_json::to_string(&s).unwrap();
        let back: RosterSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}

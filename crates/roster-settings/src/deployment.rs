//! Startup validation of the two required deployment values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{Result, SettingsError};
use crate::types::RosterSettings;

/// Where the connection registry lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryLocation {
    /// Process-local ordered map. Records vanish on restart.
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

impl FromStr for RegistryLocation {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "" => Err(SettingsError::InvalidValue {
                key: "registry.location",
                message: "empty location".into(),
            }),
            "memory" | ":memory:" => Ok(Self::Memory),
            _ => {
                let path = s
                    .strip_prefix("sqlite://")
                    .or_else(|| s.strip_prefix("sqlite:"))
                    .unwrap_or(s);
                if path.is_empty() {
                    return Err(SettingsError::InvalidValue {
                        key: "registry.location",
                        message: format!("no database path in `{s}`"),
                    });
                }
                Ok(Self::Sqlite(PathBuf::from(path)))
            }
        }
    }
}

impl fmt::Display for RegistryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

/// Which gateway receives outbound pushes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEndpoint {
    /// The server's own `/ws` endpoint.
    Local,
    /// Remote management API base URL, without a trailing slash.
    Http(String),
}

impl FromStr for GatewayEndpoint {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "local" {
            return Ok(Self::Local);
        }
        let rest = s
            .strip_prefix("https://")
            .or_else(|| s.strip_prefix("http://"));
        match rest {
            Some(host) if !host.trim_matches('/').is_empty() => {
                Ok(Self::Http(s.trim_end_matches('/').to_string()))
            }
            _ => Err(SettingsError::InvalidValue {
                key: "gateway.endpoint",
                message: format!("expected `local` or an http(s) URL, got `{s}`"),
            }),
        }
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Http(url) => f.write_str(url),
        }
    }
}

/// Validated deployment values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    /// Registry backend.
    pub registry: RegistryLocation,
    /// Push target.
    pub gateway: GatewayEndpoint,
}

impl RosterSettings {
    /// Validate the required values. Call before accepting any work.
    pub fn resolve(&self) -> Result<Deployment> {
        let registry = self
            .registry
            .location
            .as_deref()
            .ok_or(SettingsError::Missing {
                key: "registry.location",
                env: "TABLE_NAME or ROSTER_REGISTRY",
            })?
            .parse()?;
        let gateway = self
            .gateway
            .endpoint
            .as_deref()
            .ok_or(SettingsError::Missing {
                key: "gateway.endpoint",
                env: "WEBSOCKET_ADDRESS or ROSTER_GATEWAY_ENDPOINT",
            })?
            .parse()?;
        Ok(Deployment { registry, gateway })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn settings(location: Option<&str>, endpoint: Option<&str>) -> RosterSettings {
        let mut s = RosterSettings::default();
        s.registry.location = location.map(Into::into);
        s.gateway.endpoint = endpoint.map(Into::into);
        s
    }

    #[test]
    fn registry_location_variants() {
        assert_eq!("memory".parse::<RegistryLocation>().unwrap(), RegistryLocation::Memory);
        assert_eq!(
            "sqlite:/tmp/r.db".parse::<RegistryLocation>().unwrap(),
            RegistryLocation::Sqlite("/tmp/r.db".into())
        );
        assert_eq!(
            "sqlite:///tmp/r.db".parse::<RegistryLocation>().unwrap(),
            RegistryLocation::Sqlite("/tmp/r.db".into())
        );
        assert_eq!(
            "connections.db".parse::<RegistryLocation>().unwrap(),
            RegistryLocation::Sqlite("connections.db".into())
        );
    }

    #[test]
    fn registry_location_rejects_empty_path() {
        assert_matches!(
            "sqlite:".parse::<RegistryLocation>(),
            Err(SettingsError::InvalidValue { key: "registry.location", .. })
        );
    }

    #[test]
    fn gateway_endpoint_variants() {
        assert_eq!("local".parse::<GatewayEndpoint>().unwrap(), GatewayEndpoint::Local);
        assert_eq!(
            "https://abc.example.com/prod/".parse::<GatewayEndpoint>().unwrap(),
            GatewayEndpoint::Http("https://abc.example.com/prod".into())
        );
    }

    #[test]
    fn gateway_endpoint_rejects_other_schemes() {
        assert_matches!(
            "wss://abc.example.com".parse::<GatewayEndpoint>(),
            Err(SettingsError::InvalidValue { key: "gateway.endpoint", .. })
        );
        assert_matches!(
            "https://".parse::<GatewayEndpoint>(),
            Err(SettingsError::InvalidValue { .. })
        );
    }

    #[test]
    fn resolve_requires_registry_location() {
        let err = settings(None, Some("local")).resolve().unwrap_err();
        assert_matches!(err, SettingsError::Missing { key: "registry.location", .. });
    }

    #[test]
    fn resolve_requires_gateway_endpoint() {
        let err = settings(Some("memory"), None).resolve().unwrap_err();
        assert_matches!(err, SettingsError::Missing { key: "gateway.endpoint", .. });
    }

    #[test]
    fn resolve_ok() {
        let d = settings(Some("memory"), Some("http://localhost:3001")).resolve().unwrap();
        assert_eq!(d.registry, RegistryLocation::Memory);
        assert_eq!(d.gateway, GatewayEndpoint::Http("http://localhost:3001".into()));
        assert_eq!(d.gateway.to_string(), "http://localhost:3001");
    }
}

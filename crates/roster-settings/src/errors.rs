//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A required value is absent from every layer.
    #[error("missing required setting `{key}` (set {env})")]
    Missing {
        /// Dotted settings key.
        key: &'static str,
        /// Environment variable that supplies it.
        env: &'static str,
    },
    /// A settings value was present but unusable.
    #[error("invalid settings value for `{key}`: {message}")]
    InvalidValue {
        /// Dotted settings key.
        key: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_display_names_env_var() {
        let err = SettingsError::Missing {
            key: "gateway.endpoint",
            env: "WEBSOCKET_ADDRESS",
        };
        assert_eq!(
            err.to_string(),
            "missing required setting `gateway.endpoint` (set WEBSOCKET_ADDRESS)"
        );
    }

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SettingsError::Json(json_err);
        assert!(err.to_string().contains("parse settings JSON"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue {
            key: "registry.location",
            message: "empty".into(),
        };
        assert_eq!(err.to_string(), "invalid settings value for `registry.location`: empty");
    }
}

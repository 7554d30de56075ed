//! Gateway-event entry point with the `{statusCode, body}` return contract.

use std::sync::Arc;
use std::time::{Duration, Instant};

use roster_core::ConnectionId;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::coordinator::{DisconnectCoordinator, DisconnectOutcome, DisconnectReport};
use crate::errors::HandlerError;
use crate::metrics::{DISCONNECTS_TOTAL, HANDLER_DURATION_SECONDS};

/// Body returned for every successful disconnect.
pub const SUCCESS_MESSAGE: &str = "Disconnected from the server!";

/// Default wall-clock budget for one disconnect.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Inbound disconnect notification.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    /// Connection context; only `connectionId` is required.
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

/// `requestContext` of a gateway event.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Terminated connection.
    #[serde(default)]
    pub connection_id: Option<String>,
    /// e.g. `DISCONNECT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// e.g. `$disconnect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_key: Option<String>,
}

impl GatewayEvent {
    /// Event for a known connection id.
    pub fn disconnect(connection_id: impl Into<String>) -> Self {
        Self {
            request_context: Some(RequestContext {
                connection_id: Some(connection_id.into()),
                event_type: Some("DISCONNECT".into()),
                route_key: Some("$disconnect".into()),
            }),
        }
    }

    /// The terminated connection id, if present and non-empty.
    pub fn connection_id(&self) -> Result<ConnectionId, HandlerError> {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.connection_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(ConnectionId::from)
            .ok_or_else(|| HandlerError::MalformedEvent("missing requestContext.connectionId".into()))
    }
}

/// Handler return object.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    /// HTTP-style status.
    pub status_code: u16,
    /// JSON-encoded message string.
    pub body: String,
}

impl HandlerResponse {
    /// `200` with the confirmation message.
    pub fn ok() -> Self {
        Self::with_message(200, SUCCESS_MESSAGE)
    }

    /// Non-200 response describing `err`.
    pub fn from_error(err: &HandlerError) -> Self {
        Self::with_message(err.status_code(), &err.to_string())
    }

    fn with_message(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::Value::String(message.to_owned()).to_string(),
        }
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Wraps the coordinator with event parsing, a time budget and metrics.
pub struct DisconnectHandler {
    coordinator: Arc<DisconnectCoordinator>,
    timeout: Duration,
}

impl DisconnectHandler {
    /// Create a handler with the given wall-clock budget.
    pub fn new(coordinator: Arc<DisconnectCoordinator>, timeout: Duration) -> Self {
        Self {
            coordinator,
            timeout,
        }
    }

    /// The wrapped coordinator.
    pub fn coordinator(&self) -> &Arc<DisconnectCoordinator> {
        &self.coordinator
    }

    /// Disconnect `connection_id` within the budget.
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> Result<DisconnectReport, HandlerError> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.coordinator.handle(connection_id)).await {
            Ok(result) => result.map_err(HandlerError::from),
            Err(_) => Err(HandlerError::TimedOut {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        metrics::histogram!(HANDLER_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(report) => match report.outcome {
                DisconnectOutcome::Departed { .. } => "departed",
                DisconnectOutcome::AlreadyGone => "already_gone",
            },
            Err(err) => err.kind(),
        };
        metrics::counter!(DISCONNECTS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    /// Full entry point: parse, disconnect, map to the return contract.
    pub async fn handle_event(&self, event: &GatewayEvent) -> HandlerResponse {
        let result = match event.connection_id() {
            Ok(id) => self.disconnect(&id).await,
            Err(err) => {
                metrics::counter!(DISCONNECTS_TOTAL, "outcome" => err.kind()).increment(1);
                Err(err)
            }
        };
        match result {
            Ok(_) => HandlerResponse::ok(),
            Err(err) => {
                if err.status_code() >= 500 {
                    error!(error = %err, "disconnect failed");
                } else {
                    warn!(error = %err, "rejected disconnect event");
                }
                HandlerResponse::from_error(&err)
            }
        }
    }

    /// Parse a raw JSON event and handle it.
    pub async fn handle_json(&self, raw: &[u8]) -> HandlerResponse {
        match serde_json::from_slice::<GatewayEvent>(raw) {
            Ok(event) => self.handle_event(&event).await,
            Err(e) => {
                let err = HandlerError::MalformedEvent(e.to_string());
                metrics::counter!(DISCONNECTS_TOTAL, "outcome" => err.kind()).increment(1);
                warn!(error = %err, "rejected disconnect event");
                HandlerResponse::from_error(&err)
            }
        }
    }
}

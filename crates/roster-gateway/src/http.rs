//! Management-API push client.
//!
//! `POST {endpoint}/@connections/{connection_id}` with the payload as the
//! request body. Status mapping:
//!
//! | Response | Result |
//! |----------|--------|
//! | `2xx` | delivered |
//! | `410 Gone` | [`PushError::Stale`] |
//! | `429`, `5xx`, timeout, connect error | [`PushError::Transient`] |
//! | anything else | [`PushError::Rejected`] |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use roster_core::ConnectionId;
use roster_core::retry::parse_retry_after_header;
use tracing::{debug, info};

use crate::errors::{PushError, Result};
use crate::traits::GatewayPush;

/// Characters left unescaped in a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// HTTP client for a gateway management endpoint.
#[derive(Clone, Debug)]
pub struct HttpGatewayClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpGatewayClient {
    /// Build a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PushError::Rejected {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        info!(endpoint = %endpoint, "gateway client initialized");
        Ok(Self { endpoint, client })
    }

    /// Endpoint base URL, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL the payload for `connection_id` is posted to.
    pub fn connection_url(&self, connection_id: &ConnectionId) -> String {
        format!(
            "{}/@connections/{}",
            self.endpoint,
            utf8_percent_encode(connection_id.as_str(), SEGMENT)
        )
    }
}

fn classify(status: StatusCode, retry_after_ms: Option<u64>, body: String) -> PushError {
    if status == StatusCode::GONE {
        PushError::Stale
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        PushError::Transient {
            message: format!("gateway returned {status}"),
            retry_after_ms,
        }
    } else {
        PushError::Rejected {
            status: Some(status.as_u16()),
            message: if body.is_empty() {
                format!("gateway returned {status}")
            } else {
                format!("gateway returned {status}: {body}")
            },
        }
    }
}

#[async_trait]
impl GatewayPush for HttpGatewayClient {
    async fn push(&self, connection_id: &ConnectionId, payload: Arc<String>) -> Result<()> {
        let url = self.connection_url(connection_id);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(String::clone(&payload))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    PushError::transient(e.to_string())
                } else {
                    PushError::Rejected {
                        status: None,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(connection_id = %connection_id, %status, "push delivered");
            return Ok(());
        }

        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after_header);
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, retry_after_ms, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpGatewayClient {
        HttpGatewayClient::new(server.uri(), Duration::from_millis(500)).unwrap()
    }

    fn payload() -> Arc<String> {
        Arc::new(r#"{"action":"userExit","userName":"alice","connectionId":"A"}"#.into())
    }

    #[test]
    fn url_escapes_connection_id() {
        let c = HttpGatewayClient::new("https://gw.example/prod/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "https://gw.example/prod");
        assert_eq!(
            c.connection_url(&"Ab/c=".into()),
            "https://gw.example/prod/@connections/Ab%2Fc%3D"
        );
        assert_eq!(
            c.connection_url(&"x-y_z.~".into()),
            "https://gw.example/prod/@connections/x-y_z.~"
        );
    }

    #[tokio::test]
    async fn success_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/@connections/B"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "action": "userExit",
                "userName": "alice",
                "connectionId": "A"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).push(&"B".into(), payload()).await.unwrap();
    }

    #[tokio::test]
    async fn gone_is_stale() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let err = client(&server).push(&"B".into(), payload()).await.unwrap_err();
        assert_eq!(err, PushError::Stale);
    }

    #[tokio::test]
    async fn throttled_is_transient_with_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let err = client(&server).push(&"B".into(), payload()).await.unwrap_err();
        assert_matches!(err, PushError::Transient { retry_after_ms: Some(2000), .. });
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).push(&"B".into(), payload()).await.unwrap_err();
        assert_matches!(err, PushError::Transient { retry_after_ms: None, .. });
    }

    #[tokio::test]
    async fn forbidden_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("no"))
            .mount(&server)
            .await;

        let err = client(&server).push(&"B".into(), payload()).await.unwrap_err();
        assert_matches!(err, PushError::Rejected { status: Some(403), message } if message.ends_with(": no"));
    }

    #[tokio::test]
    async fn slow_gateway_times_out_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = client(&server).push(&"B".into(), payload()).await.unwrap_err();
        assert!(matches!(err, PushError::Transient { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_gateway_is_transient() {
        let c = HttpGatewayClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = c.push(&"B".into(), payload()).await.unwrap_err();
        assert!(matches!(err, PushError::Transient { .. }), "got {err:?}");
    }
}

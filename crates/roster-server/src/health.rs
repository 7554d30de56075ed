//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the registry cannot be counted.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registry record count, when available.
    pub connections: Option<usize>,
}

/// Build a health response from the registry count.
pub fn health_check(start_time: Instant, connections: Option<usize>) -> HealthResponse {
    HealthResponse {
        status: if connections.is_some() { "ok" } else { "degraded" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), Some(0));
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, Some(0)).uptime_secs >= 59);
    }

    #[test]
    fn missing_count_is_degraded() {
        let resp = health_check(Instant::now(), None);
        assert_eq!(resp.status, "degraded");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["connections"].is_null());
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_value(health_check(Instant::now(), Some(3))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 3);
        assert!(json["uptime_secs"].is_number());
    }
}

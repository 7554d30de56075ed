//! Registry rows and presence events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// One live participant, keyed by connection id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Primary key.
    pub connection_id: ConnectionId,
    /// Display name of the participant.
    pub user_name: String,
    /// When the connection was registered.
    pub joined_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Build a record stamped with the current time.
    pub fn new(connection_id: impl Into<ConnectionId>, user_name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_name: user_name.into(),
            joined_at: Utc::now(),
        }
    }
}

/// Discriminator carried in the `action` field of every presence event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventAction {
    /// A participant left.
    #[serde(rename = "userExit")]
    UserExit,
}

/// Departure notification pushed to every remaining participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectEvent {
    /// Always [`EventAction::UserExit`].
    pub action: EventAction,
    /// Name of the departing participant.
    pub user_name: String,
    /// Connection id of the departing participant.
    pub connection_id: ConnectionId,
}

impl DisconnectEvent {
    /// Build the departure event for a removed record.
    pub fn from_record(record: &ConnectionRecord) -> Self {
        Self {
            action: EventAction::UserExit,
            user_name: record.user_name.clone(),
            connection_id: record.connection_id.clone(),
        }
    }

    /// Serialize once; every recipient shares the same buffer.
    pub fn to_payload(&self) -> serde_json::Result<Arc<String>> {
        serde_json::to_string(self).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_camel_case() {
        let record = ConnectionRecord::new("A", "alice");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["connectionId"], "A");
        assert_eq!(value["userName"], "alice");
        assert!(value["joinedAt"].is_string());
    }

    #[test]
    fn event_wire_format() {
        let record = ConnectionRecord::new("A", "alice");
        let event = DisconnectEvent::from_record(&record);
        let payload = event.to_payload().unwrap();
        insta::assert_snapshot!(payload.as_str(), @r#"{"action":"userExit","userName":"alice","connectionId":"A"}"#);
    }

    #[test]
    fn event_parses_from_wire() {
        let json = r#"{"action":"userExit","userName":"bob","connectionId":"B"}"#;
        let event: DisconnectEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.action, EventAction::UserExit);
        assert_eq!(event.user_name, "bob");
        assert_eq!(event.connection_id.as_str(), "B");
    }

    #[test]
    fn unknown_action_rejected() {
        let json = r#"{"action":"userJoin","userName":"bob","connectionId":"B"}"#;
        assert!(serde_json::from_str::<DisconnectEvent>(json).is_err());
    }

    #[test]
    fn user_name_with_quotes_is_escaped() {
        let record = ConnectionRecord::new("Q", "the \"quoted\" one");
        let payload = DisconnectEvent::from_record(&record).to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["userName"], "the \"quoted\" one");
    }
}

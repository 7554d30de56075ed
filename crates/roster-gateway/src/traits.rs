//! The push seam.

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::ConnectionId;

use crate::errors::Result;

/// Delivers one payload to one connection.
///
/// Implementations make a single attempt; retrying is the caller's concern
/// (see [`push_with_retry`](crate::push_with_retry)).
#[async_trait]
pub trait GatewayPush: Send + Sync {
    /// Push `payload` to `connection_id`.
    async fn push(&self, connection_id: &ConnectionId, payload: Arc<String>) -> Result<()>;
}

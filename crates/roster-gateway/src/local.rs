//! In-process gateway for sockets served by this process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use roster_core::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::errors::{PushError, Result};
use crate::traits::GatewayPush;

/// Outbound half of one attached socket.
pub struct ClientConnection {
    /// Connection id.
    pub id: ConnectionId,
    /// Send channel to the socket's write task.
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    /// Messages refused because the channel was full.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around a write-task channel.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a message without waiting.
    ///
    /// A full channel is transient; a closed one means the socket is gone.
    pub fn send(&self, message: Arc<String>) -> Result<()> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(PushError::transient("client send buffer full"))
            }
            Err(TrySendError::Closed(_)) => Err(PushError::Stale),
        }
    }

    /// Total messages refused for a full channel.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Gateway over sockets attached to this process.
#[derive(Default)]
pub struct LocalGateway {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl LocalGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a socket, replacing any previous one with the same id.
    pub fn attach(&self, connection: Arc<ClientConnection>) {
        let id = connection.id.clone();
        let _ = self.connections.write().insert(id.clone(), connection);
        debug!(connection_id = %id, "socket attached");
    }

    /// Detach a socket. Later pushes to it are stale.
    pub fn detach(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let removed = self.connections.write().remove(connection_id);
        if removed.is_some() {
            debug!(connection_id = %connection_id, "socket detached");
        }
        removed
    }

    /// Number of attached sockets.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no sockets are attached.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

#[async_trait]
impl GatewayPush for LocalGateway {
    async fn push(&self, connection_id: &ConnectionId, payload: Arc<String>) -> Result<()> {
        let connection = self.connections.read().get(connection_id).cloned();
        match connection {
            Some(connection) => connection.send(payload),
            None => Err(PushError::Stale),
        }
    }
}

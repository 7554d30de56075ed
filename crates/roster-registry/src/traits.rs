//! The registry seam.

use async_trait::async_trait;
use roster_core::{ConnectionId, ConnectionRecord};

use crate::errors::Result;

/// Result of a delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A record was removed.
    Deleted,
    /// No record had that id. Not an error: the delete already happened.
    NotFound,
}

/// One page of a keyset scan, ordered by connection id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Records strictly after the requested cursor.
    pub records: Vec<ConnectionRecord>,
    /// Cursor for the next page; `None` when the scan is complete.
    pub next_cursor: Option<ConnectionId>,
}

impl ScanPage {
    /// Build a page, setting the cursor only when the page came back full.
    pub fn from_records(records: Vec<ConnectionRecord>, limit: usize) -> Self {
        let next_cursor = if records.len() >= limit {
            records.last().map(|r| r.connection_id.clone())
        } else {
            None
        };
        Self {
            records,
            next_cursor,
        }
    }
}

/// Keyed store of live connections.
///
/// Implementations must make each call atomic for its key. Scans are only
/// as consistent as "state at call time": records inserted or deleted while
/// a multi-page scan is running may or may not appear.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Insert or replace the record for its connection id.
    async fn insert(&self, record: ConnectionRecord) -> Result<()>;

    /// Point lookup.
    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>>;

    /// Remove a record. Deleting a missing id reports [`DeleteOutcome::NotFound`].
    async fn delete(&self, connection_id: &ConnectionId) -> Result<DeleteOutcome>;

    /// Up to `limit` records with ids strictly greater than `after`.
    async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage>;

    /// Number of records.
    async fn count(&self) -> Result<usize>;
}

//! Process-local registry.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;
use roster_core::{ConnectionId, ConnectionRecord};

use crate::errors::Result;
use crate::traits::{ConnectionRegistry, DeleteOutcome, ScanPage};

/// Ordered in-memory registry.
///
/// Used for `memory` deployments and tests. The lock is never held across
/// an `.await`.
#[derive(Default)]
pub struct InMemoryRegistry {
    records: RwLock<BTreeMap<ConnectionId, ConnectionRecord>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryRegistry {
    async fn insert(&self, record: ConnectionRecord) -> Result<()> {
        let _ = self
            .records
            .write()
            .insert(record.connection_id.clone(), record);
        Ok(())
    }

    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        Ok(self.records.read().get(connection_id).cloned())
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<DeleteOutcome> {
        Ok(match self.records.write().remove(connection_id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let records: Vec<ConnectionRecord> = self
            .records
            .read()
            .range::<ConnectionId, _>((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect();
        Ok(ScanPage::from_records(records, limit))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}

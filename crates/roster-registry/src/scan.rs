//! Lazy full scan built from keyset pages.

use futures::stream::BoxStream;
use roster_core::{ConnectionId, ConnectionRecord};

use crate::errors::Result;
use crate::traits::ConnectionRegistry;

/// Stream every record in the registry, fetching `page_size` at a time.
///
/// Pages are requested only as the consumer polls, so a caller that stops
/// early never reads the rest of the table. The first error ends the stream.
pub fn scan<R>(registry: &R, page_size: usize) -> BoxStream<'_, Result<ConnectionRecord>>
where
    R: ConnectionRegistry + ?Sized,
{
    type Item = Result<ConnectionRecord>;

    let page_size = page_size.max(1);
    Box::pin(async_stream::stream! {
        let mut cursor: Option<ConnectionId> = None;
        loop {
            let page = match registry.scan_page(cursor.as_ref(), page_size).await {
                Ok(page) => page,
                Err(err) => {
                    let item: Item = Err(err);
                    yield item;
                    break;
                }
            };
            for record in page.records {
                let item: Item = Ok(record);
                yield item;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RegistryError;
    use crate::memory::InMemoryRegistry;
    use crate::traits::{DeleteOutcome, ScanPage};
    use async_trait::async_trait;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn seeded(n: usize) -> InMemoryRegistry {
        let registry = InMemoryRegistry::new();
        for i in 0..n {
            registry
                .insert(ConnectionRecord::new(format!("conn-{i:03}"), format!("user-{i}")))
                .await
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn scans_across_pages_in_key_order() {
        let registry = seeded(7).await;
        let records: Vec<ConnectionRecord> = scan(&registry, 3).try_collect().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.connection_id.as_str()).collect();
        assert_eq!(
            ids,
            ["conn-000", "conn-001", "conn-002", "conn-003", "conn-004", "conn-005", "conn-006"]
        );
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size() {
        let registry = seeded(6).await;
        let records: Vec<ConnectionRecord> = scan(&registry, 3).try_collect().await.unwrap();
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn empty_registry_yields_nothing() {
        let registry = InMemoryRegistry::new();
        let records: Vec<ConnectionRecord> = scan(&registry, 10).try_collect().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn zero_page_size_is_clamped() {
        let registry = seeded(2).await;
        let records: Vec<ConnectionRecord> = scan(&registry, 0).try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn tolerates_delete_during_scan() {
        let registry = seeded(4).await;
        let mut stream = scan(&registry, 2);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.connection_id.as_str(), "conn-000");
        // Remove a record in the page not yet fetched.
        let _ = registry.delete(&ConnectionId::from("conn-003")).await.unwrap();
        let rest: Vec<ConnectionRecord> = stream.try_collect().await.unwrap();
        let ids: Vec<&str> = rest.iter().map(|r| r.connection_id.as_str()).collect();
        assert_eq!(ids, ["conn-001", "conn-002"]);
    }

    struct FailsOnSecondPage {
        inner: InMemoryRegistry,
        pages: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionRegistry for FailsOnSecondPage {
        async fn insert(&self, record: ConnectionRecord) -> Result<()> {
            self.inner.insert(record).await
        }
        async fn get(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
            self.inner.get(id).await
        }
        async fn delete(&self, id: &ConnectionId) -> Result<DeleteOutcome> {
            self.inner.delete(id).await
        }
        async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage> {
            if self.pages.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(RegistryError::Unavailable {
                    message: "gone".into(),
                });
            }
            self.inner.scan_page(after, limit).await
        }
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn error_ends_stream_after_yielded_records() {
        let registry = FailsOnSecondPage {
            inner: seeded(4).await,
            pages: AtomicUsize::new(0),
        };
        let items: Vec<Result<ConnectionRecord>> = scan(&registry, 2).collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(RegistryError::Unavailable { .. })));
    }
}

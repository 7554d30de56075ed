//! Bounded retry around any registry.

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::retry::{RetryConfig, RetryResult, retry_with_backoff};
use roster_core::{ConnectionId, ConnectionRecord};
use tracing::warn;

use crate::errors::{RegistryError, Result};
use crate::traits::{ConnectionRegistry, DeleteOutcome, ScanPage};

/// Counter of registry retries (attempts after the first).
pub const REGISTRY_RETRIES_TOTAL: &str = "roster_registry_retries_total";

/// Decorator that retries [`RegistryError::Transient`] failures.
///
/// When the attempt bound is exhausted the last transient error is reported
/// as [`RegistryError::Unavailable`]; every other error passes through on the
/// first occurrence.
#[derive(Clone)]
pub struct RetryingRegistry {
    inner: Arc<dyn ConnectionRegistry>,
    config: RetryConfig,
}

impl RetryingRegistry {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: Arc<dyn ConnectionRegistry>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The retry policy in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

fn settle<T>(op: &'static str, result: RetryResult<T, RegistryError>) -> Result<T> {
    let retries = result.retries();
    if retries > 0 {
        metrics::counter!(REGISTRY_RETRIES_TOTAL, "op" => op).increment(u64::from(retries));
    }
    result.outcome.map_err(|err| match err {
        RegistryError::Transient { message } => {
            warn!(op, attempts = result.attempts, %message, "registry retries exhausted");
            RegistryError::Unavailable {
                message: format!("{message} (after {} attempts)", result.attempts),
            }
        }
        other => other,
    })
}

#[async_trait]
impl ConnectionRegistry for RetryingRegistry {
    async fn insert(&self, record: ConnectionRecord) -> Result<()> {
        let result = retry_with_backoff(&self.config, "registry.insert", || {
            self.inner.insert(record.clone())
        })
        .await;
        settle("insert", result)
    }

    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        let result = retry_with_backoff(&self.config, "registry.get", || {
            self.inner.get(connection_id)
        })
        .await;
        settle("get", result)
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<DeleteOutcome> {
        let result = retry_with_backoff(&self.config, "registry.delete", || {
            self.inner.delete(connection_id)
        })
        .await;
        settle("delete", result)
    }

    async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage> {
        let result = retry_with_backoff(&self.config, "registry.scan_page", || {
            self.inner.scan_page(after, limit)
        })
        .await;
        settle("scan_page", result)
    }

    async fn count(&self) -> Result<usize> {
        let result =
            retry_with_backoff(&self.config, "registry.count", || self.inner.count()).await;
        settle("count", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRegistry;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `get` and `delete` transiently a fixed number of times.
    struct Flaky {
        inner: InMemoryRegistry,
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryRegistry::new(),
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }

        fn trip(&self) -> Result<()> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(RegistryError::Transient {
                    message: "database is locked".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ConnectionRegistry for Flaky {
        async fn insert(&self, record: ConnectionRecord) -> Result<()> {
            self.inner.insert(record).await
        }
        async fn get(&self, id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
            self.trip()?;
            self.inner.get(id).await
        }
        async fn delete(&self, id: &ConnectionId) -> Result<DeleteOutcome> {
            self.trip()?;
            self.inner.delete(id).await
        }
        async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage> {
            self.inner.scan_page(after, limit).await
        }
        async fn count(&self) -> Result<usize> {
            Err(RegistryError::Corrupt {
                connection_id: "Z".into(),
                message: "unreadable".into(),
            })
        }
    }

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 10,
            max_delay_ms: 50,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_absorbed() {
        let flaky = Arc::new(Flaky::new(2));
        flaky.insert(ConnectionRecord::new("A", "alice")).await.unwrap();
        let registry = RetryingRegistry::new(flaky.clone(), fast(3));

        let got = registry.get(&"A".into()).await.unwrap();
        assert_eq!(got.unwrap().user_name, "alice");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_become_unavailable() {
        let flaky = Arc::new(Flaky::new(10));
        let registry = RetryingRegistry::new(flaky.clone(), fast(3));

        let err = registry.delete(&"A".into()).await.unwrap_err();
        assert_matches!(err, RegistryError::Unavailable { message } if message.contains("3 attempts"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_pass_through() {
        let registry = RetryingRegistry::new(Arc::new(Flaky::new(0)), fast(5));
        let err = registry.count().await.unwrap_err();
        assert_matches!(err, RegistryError::Corrupt { .. });
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let flaky = Arc::new(Flaky::new(0));
        let registry = RetryingRegistry::new(flaky.clone(), fast(5));
        assert_eq!(
            registry.delete(&"missing".into()).await.unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}

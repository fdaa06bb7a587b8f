//! Outcome history: source abstraction and freshness-cached store.
//!
//! Defines the `HistorySource` trait (anything that can deliver the
//! chronological outcome feed) and `HistoryStore`, which keeps the last
//! successful fetch and only goes back upstream once it is stale.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::types::OutcomeSequence;

/// Abstraction over the upstream history feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the full outcome sequence, oldest first.
    async fn fetch_history(&self) -> Result<OutcomeSequence>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Snapshot {
    records: Arc<OutcomeSequence>,
    fetched_at: Instant,
}

/// Get-or-refresh cache in front of a `HistorySource`.
///
/// A failed refresh never reaches the caller: it is logged and whatever
/// was cached before (possibly nothing) is served instead.
pub struct HistoryStore {
    source: Arc<dyn HistorySource>,
    ttl: Duration,
    timeout: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl HistoryStore {
    pub fn new(source: Arc<dyn HistorySource>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            timeout,
            snapshot: RwLock::new(None),
        }
    }

    /// Return the cached history if fresh, otherwise refresh it.
    pub async fn get_history(&self) -> Arc<OutcomeSequence> {
        if let Some(records) = self.fresh().await {
            debug!(count = records.len(), "History cache hit");
            return records;
        }

        match tokio::time::timeout(self.timeout, self.source.fetch_history()).await {
            Ok(Ok(records)) => {
                let records = Arc::new(records);
                *self.snapshot.write().await = Some(Snapshot {
                    records: Arc::clone(&records),
                    fetched_at: Instant::now(),
                });
                info!(
                    source = self.source.name(),
                    count = records.len(),
                    "History refreshed"
                );
                records
            }
            Ok(Err(e)) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "History fetch failed, serving cached data"
                );
                self.cached().await
            }
            Err(_) => {
                warn!(
                    source = self.source.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "History fetch timed out, serving cached data"
                );
                self.cached().await
            }
        }
    }

    /// Whatever is cached, fresh or not (empty if nothing was ever fetched).
    pub async fn cached(&self) -> Arc<OutcomeSequence> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.records))
            .unwrap_or_default()
    }

    /// Number of cached records.
    pub async fn cached_len(&self) -> usize {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map_or(0, |s| s.records.len())
    }

    async fn fresh(&self) -> Option<Arc<OutcomeSequence>> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < self.ttl)
            .map(|s| Arc::clone(&s.records))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Outcome, OutcomeRecord};

    fn sample(n: usize) -> OutcomeSequence {
        (0..n)
            .map(|i| OutcomeRecord::new(i as u64 + 1, Outcome::Tai, 12))
            .collect()
    }

    fn store(mock: MockHistorySource) -> HistoryStore {
        HistoryStore::new(
            Arc::new(mock),
            Duration::from_millis(60_000),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_fetches_on_first_call() {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_history().times(1).returning(|| Ok(sample(7)));

        let store = store(mock);
        let history = store.get_history().await;
        assert_eq!(history.len(), 7);
        assert_eq!(store.cached_len().await, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_cache_within_ttl() {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_history().times(1).returning(|| Ok(sample(3)));

        let store = store(mock);
        store.get_history().await;
        tokio::time::advance(Duration::from_millis(59_000)).await;
        let again = store.get_history().await;
        assert_eq!(again.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_ttl() {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        let mut calls = 0;
        mock.expect_fetch_history().times(2).returning(move || {
            calls += 1;
            Ok(sample(calls * 10))
        });

        let store = store(mock);
        assert_eq!(store.get_history().await.len(), 10);
        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert_eq!(store.get_history().await.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_stale_data() {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        let mut first = true;
        mock.expect_fetch_history().times(2).returning(move || {
            if first {
                first = false;
                Ok(sample(5))
            } else {
                Err(anyhow::anyhow!("connection refused"))
            }
        });

        let store = store(mock);
        store.get_history().await;
        tokio::time::advance(Duration::from_secs(120)).await;
        let stale = store.get_history().await;
        assert_eq!(stale.len(), 5);
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_empty() {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_history()
            .returning(|| Err(anyhow::anyhow!("HTTP 503")));

        let store = store(mock);
        assert!(store.get_history().await.is_empty());
        assert_eq!(store.cached_len().await, 0);
    }

    struct SlowSource;

    #[async_trait]
    impl HistorySource for SlowSource {
        async fn fetch_history(&self) -> Result<OutcomeSequence> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(sample(9))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_to_cache() {
        let store = HistoryStore::new(
            Arc::new(SlowSource),
            Duration::from_millis(60_000),
            Duration::from_secs(10),
        );
        let history = store.get_history().await;
        assert!(history.is_empty());
    }
}

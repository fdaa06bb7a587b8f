//! Scheduled cache warming.
//!
//! A background task that regenerates the prediction on a fixed interval
//! so live requests usually hit a fresh cache entry. Scheduling lives here;
//! the pipeline knows nothing about it.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::pipeline::Predictor;

/// Run one warm cycle. Returns whether the cache was refreshed.
pub async fn warm_once(predictor: &Predictor) -> bool {
    info!("Warming prediction cache");
    match predictor.warm().await {
        Ok(()) => {
            info!("Cache warmed");
            true
        }
        Err(e) => {
            warn!(error = %e, "Cache warming failed");
            false
        }
    }
}

/// Spawn the warming loop. The first tick fires one full `interval` after
/// start; abort the returned handle to stop it.
pub fn spawn_cache_warmer(predictor: Arc<Predictor>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Cache warmer started");

        loop {
            ticker.tick().await;
            warm_once(&predictor).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::history::MockHistorySource;
    use crate::types::{Outcome, OutcomeRecord};

    fn predictor_with(records: Vec<OutcomeRecord>) -> Arc<Predictor> {
        let mut mock = MockHistorySource::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_history()
            .returning(move || Ok(records.clone()));
        Arc::new(Predictor::with_sources(
            &AppConfig::default(),
            Arc::new(mock),
            None,
        ))
    }

    fn records(n: u64) -> Vec<OutcomeRecord> {
        (1..=n)
            .map(|i| OutcomeRecord::new(i, Outcome::Xiu, 6))
            .collect()
    }

    #[tokio::test]
    async fn test_warm_once_success() {
        let p = predictor_with(records(8));
        assert!(warm_once(&p).await);
        assert!(p.cache().peek().await.is_some());
    }

    #[tokio::test]
    async fn test_warm_once_failure_is_logged_not_raised() {
        let p = predictor_with(Vec::new());
        assert!(!warm_once(&p).await);
        assert!(p.cache().peek().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_warmer_fills_cache() {
        let p = predictor_with(records(8));
        let handle = spawn_cache_warmer(Arc::clone(&p), Duration::from_secs(300));

        // Nothing before the first tick.
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(p.cache().peek().await.is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(p.cache().peek().await.is_some());

        handle.abort();
    }
}

//! Background loops driving the counter.
//!
//! - [`run_increment_loop`] advances the [`Counter`] on a fixed period.
//! - [`run_persistence_loop`] checkpoints the counter to the
//!   [`CounterStore`] on a fixed period.
//!
//! Both start their first tick one full period after launch and stop when
//! the shutdown token is cancelled. A persistence write failure ends the
//! loop with [`PersistError`]; the caller treats it as fatal.

use std::sync::Arc;
use std::time::Duration;

use clapper_store::{CounterStore, StoreError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::counter::Counter;

/// Errors that end the persistence loop.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The store rejected a checkpoint.
    #[error("failed to persist counter value {value}: {source}")]
    Write {
        /// The value that could not be written.
        value: u64,
        /// The underlying store error.
        source: StoreError,
    },
}

/// Advance `counter` by one quantum every `period` until `shutdown` fires.
///
/// Missed ticks are replayed in a burst so the counter keeps pace with
/// wall-clock time when the runtime falls behind.
pub async fn run_increment_loop(
    counter: Arc<Counter>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    debug!(period_ms = period.as_millis(), "increment loop started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("increment loop stopped");
                return;
            }
            _ = ticker.tick() => counter.inc(),
        }
    }
}

/// Write `counter` to `store` every `period` until `shutdown` fires.
///
/// Returns immediately when the store is not durable; there is nothing to
/// checkpoint to.
///
/// # Errors
///
/// Returns [`PersistError::Write`] on the first failed write.
pub async fn run_persistence_loop(
    counter: Arc<Counter>,
    store: Arc<CounterStore>,
    period: Duration,
    shutdown: CancellationToken,
) -> Result<(), PersistError> {
    if !store.is_durable() {
        info!(store = store.kind(), "no durable store configured, persistence disabled");
        return Ok(());
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        store = store.kind(),
        period_ms = period.as_millis(),
        "persistence loop started"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("persistence loop stopped");
                return Ok(());
            }
            _ = ticker.tick() => {
                let value = counter.load();
                if let Err(source) = store.write(value).await {
                    error!(value, error = %source, "persisting counter failed");
                    return Err(PersistError::Write { value, source });
                }
                debug!(value, "counter persisted");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn increment_loop_advances_once_per_period() {
        let counter = Arc::new(Counter::new(0, 10));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_increment_loop(
            Arc::clone(&counter),
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(105)).await;
        assert_eq!(counter.load(), 100);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn increment_loop_survives_concurrent_reset() {
        let counter = Arc::new(Counter::new(5_000, 1));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_increment_loop(
            Arc::clone(&counter),
            Duration::from_millis(1),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        counter.reset();
        assert_eq!(counter.load(), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(counter.load() < 1_000);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn persistence_skipped_without_durable_store() {
        let counter = Arc::new(Counter::new(42, 1));
        let store = Arc::new(CounterStore::from_path(None));
        let result = run_persistence_loop(
            counter,
            store,
            Duration::from_millis(1),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_writes_current_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count");
        let counter = Arc::new(Counter::new(9_999, 1));
        let store = Arc::new(CounterStore::from_path(Some(path.clone())));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_persistence_loop(
            Arc::clone(&counter),
            Arc::clone(&store),
            Duration::from_secs(10),
            shutdown.clone(),
        ));

        // Nothing is written before the first period elapses.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_secs(6)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "9999");
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("count");
        let counter = Arc::new(Counter::new(7, 1));
        let store = Arc::new(CounterStore::from_path(Some(path)));

        let err = run_persistence_loop(
            counter,
            store,
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PersistError::Write { value: 7, .. }));
    }
}

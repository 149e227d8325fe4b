//! Periodic trigger for auction cycles.
//!
//! The first cycle fires one period after [`AuctionScheduler::spawn`].
//! Each tick runs the cycle on its own task so a slow cycle never delays
//! the clock; the engine skips ticks that land while a cycle is running.

use std::sync::Arc;
use std::time::Duration;

use callmatch_types::{CallmatchError, Result};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::engine::AuctionEngine;

/// Tick counters, returned on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub completed: u64,
    pub skipped: u64,
}

pub struct AuctionScheduler;

impl AuctionScheduler {
    /// Start ticking every `period` on the current runtime.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    #[must_use]
    pub fn spawn(engine: Arc<AuctionEngine>, period: Duration) -> SchedulerHandle {
        assert!(!period.is_zero(), "auction period must be non-zero");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(tick_loop(engine, period, shutdown_rx));
        tracing::info!(period_ms = period.as_millis(), "auction scheduler started");
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<SchedulerStats>,
}

impl SchedulerHandle {
    /// Stop ticking and wait for in-flight cycles to finish.
    pub async fn shutdown(self) -> Result<SchedulerStats> {
        // The loop may already be gone if it panicked; the join reports that.
        let _ = self.shutdown.send(());
        let stats = self
            .task
            .await
            .map_err(|err| CallmatchError::Internal(format!("scheduler task failed: {err}")))?;
        tracing::info!(
            ticks = stats.ticks,
            completed = stats.completed,
            skipped = stats.skipped,
            "auction scheduler stopped"
        );
        Ok(stats)
    }
}

async fn tick_loop(
    engine: Arc<AuctionEngine>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> SchedulerStats {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();
    let mut stats = SchedulerStats::default();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                stats.ticks += 1;
                let engine = Arc::clone(&engine);
                cycles.spawn(async move { engine.run_auction().await.is_some() });
            }
            Some(joined) = cycles.join_next() => record(&mut stats, joined),
        }
    }

    while let Some(joined) = cycles.join_next().await {
        record(&mut stats, joined);
    }
    stats
}

fn record(stats: &mut SchedulerStats, joined: std::result::Result<bool, tokio::task::JoinError>) {
    match joined {
        Ok(true) => stats.completed += 1,
        Ok(false) => stats.skipped += 1,
        Err(err) => tracing::error!(%err, "auction task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use callmatch_ledger::InMemoryLedger;
    use callmatch_matchcore::OrderBook;
    use callmatch_types::Instrument;
    use parking_lot::Mutex;

    use super::*;
    use crate::history::AuctionHistory;
    use crate::margin_guard::MarginGuard;
    use crate::publisher::LogPublisher;

    fn engine() -> Arc<AuctionEngine> {
        let ledger = Arc::new(InMemoryLedger::new());
        let guard = Arc::new(MarginGuard::new(ledger, Instrument::main()));
        Arc::new(AuctionEngine::new(
            Arc::new(Mutex::new(OrderBook::new())),
            guard,
            Arc::new(LogPublisher),
            Arc::new(AuctionHistory::new(64)),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let engine = engine();
        let handle = AuctionScheduler::spawn(engine.clone(), Duration::from_secs(5));

        time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(engine.history().len(), 0);

        time::sleep(Duration::from_millis(10_200)).await;
        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(engine.history().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_tick_runs_nothing() {
        let engine = engine();
        let handle = AuctionScheduler::spawn(engine.clone(), Duration::from_secs(1));
        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats, SchedulerStats::default());
        assert!(engine.history().is_empty());
    }
}

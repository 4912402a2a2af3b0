// Collection loop: on every tick, aggregate one snapshot and hand it to the transport.
// A failed cycle is counted and logged; the loop only stops on cancellation.

use crate::aggregator::Aggregator;
use crate::transport::{DeliveryResult, Transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Aggregator, transport and shutdown for the loop.
pub struct CollectorDeps {
    pub aggregator: Arc<Aggregator>,
    pub transport: Arc<dyn Transport>,
    pub cancel: CancellationToken,
}

/// Loop timing. Stats logging uses its own real-time interval.
pub struct CollectorConfig {
    pub interval: Duration,
    pub stats_log_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            stats_log_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Collecting,
}

#[derive(Debug, Default)]
pub struct CollectorStats {
    pub cycles_total: AtomicU64,
    pub delivered_total: AtomicU64,
    pub failed_total: AtomicU64,
}

impl CollectorStats {
    pub fn cycles(&self) -> u64 {
        self.cycles_total.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered_total.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }
}

pub struct CollectorHandle {
    pub join: tokio::task::JoinHandle<()>,
    pub state: watch::Receiver<LoopState>,
    pub stats: Arc<CollectorStats>,
}

impl CollectorHandle {
    /// Waits for the loop task to finish (after its token is cancelled).
    pub async fn stopped(self) {
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "collector task ended abnormally");
        }
    }
}

pub fn spawn(deps: CollectorDeps, config: CollectorConfig) -> CollectorHandle {
    let CollectorDeps {
        aggregator,
        transport,
        cancel,
    } = deps;
    let CollectorConfig {
        interval: period,
        stats_log_interval,
    } = config;

    let (state_tx, state_rx) = watch::channel(LoopState::Idle);
    let stats = Arc::new(CollectorStats::default());
    let loop_stats = stats.clone();

    let join = tokio::spawn(async move {
        let stats = loop_stats;
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first stats tick fires immediately; nothing to report yet.
        stats_log_tick.reset();

        tracing::info!(
            transport = transport.name(),
            sampler = aggregator.sampler().name(),
            interval_ms = period.as_millis() as u64,
            "collector started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    state_tx.send_replace(LoopState::Collecting);
                    let cycle = async {
                        let snapshot = aggregator.aggregate().await;
                        transport.deliver(&snapshot).await
                    };
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => None,
                        result = cycle => Some(result),
                    };
                    state_tx.send_replace(LoopState::Idle);

                    let Some(result) = outcome else {
                        tracing::debug!("in-flight cycle abandoned on shutdown");
                        break;
                    };
                    stats.cycles_total.fetch_add(1, Ordering::Relaxed);
                    match result {
                        DeliveryResult::Delivered => {
                            stats.delivered_total.fetch_add(1, Ordering::Relaxed);
                        }
                        DeliveryResult::Failed(e) => {
                            stats.failed_total.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                error = %e,
                                transport = transport.name(),
                                operation = "deliver",
                                "snapshot delivery failed"
                            );
                        }
                    }
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        cycles_total = stats.cycles(),
                        delivered_total = stats.delivered(),
                        failed_total = stats.failed(),
                        "collector stats"
                    );
                }
            }
        }

        drop(transport);
        tracing::info!(
            cycles_total = stats.cycles(),
            delivered_total = stats.delivered(),
            failed_total = stats.failed(),
            "collector stopped"
        );
    });

    CollectorHandle {
        join,
        state: state_rx,
        stats,
    }
}

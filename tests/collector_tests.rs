// Collection loop: cycles keep running through sampling and delivery failures, and stop on cancel

mod common;

use async_trait::async_trait;
use common::CountingSampler;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vpsmon::aggregator::{Aggregator, AggregatorConfig};
use vpsmon::collector::{CollectorConfig, CollectorDeps, LoopState, spawn};
use vpsmon::error::DeliveryError;
use vpsmon::history_store::{HistoryConfig, HistoryStore};
use vpsmon::models::MetricsSnapshot;
use vpsmon::transport::{DeliveryResult, PullTransport, Transport};

/// Records snapshots; after the first delivery it heals the sampler.
struct HealingRecorder {
    sampler: Arc<CountingSampler>,
    seen: Mutex<Vec<MetricsSnapshot>>,
}

#[async_trait]
impl Transport for HealingRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }
    async fn deliver(&self, snapshot: &MetricsSnapshot) -> DeliveryResult {
        self.seen.lock().unwrap().push(snapshot.clone());
        self.sampler.failing.store(false, Ordering::SeqCst);
        DeliveryResult::Delivered
    }
}

struct AlwaysUnreachable;

#[async_trait]
impl Transport for AlwaysUnreachable {
    fn name(&self) -> &'static str {
        "unreachable"
    }
    async fn deliver(&self, _snapshot: &MetricsSnapshot) -> DeliveryResult {
        DeliveryResult::Failed(DeliveryError::Unreachable("connection refused".into()))
    }
}

fn aggregator(sampler: Arc<CountingSampler>) -> Arc<Aggregator> {
    Arc::new(Aggregator::new(
        sampler,
        AggregatorConfig {
            family_timeout: Duration::from_millis(500),
            disk_mount: "/".into(),
        },
    ))
}

fn config() -> CollectorConfig {
    CollectorConfig {
        interval: Duration::from_secs(1),
        stats_log_interval: Duration::from_secs(3600),
    }
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_yields_unknown_snapshot_and_loop_continues() {
    let sampler = Arc::new(CountingSampler::failing());
    let recorder = Arc::new(HealingRecorder {
        sampler: sampler.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let cancel = CancellationToken::new();
    let handle = spawn(
        CollectorDeps {
            aggregator: aggregator(sampler),
            transport: recorder.clone(),
            cancel: cancel.clone(),
        },
        config(),
    );

    while recorder.seen.lock().unwrap().len() < 2 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cancel.cancel();
    let stats = handle.stats.clone();
    let state = handle.state.clone();
    handle.stopped().await;

    let seen = recorder.seen.lock().unwrap().clone();
    let first = &seen[0];
    assert_eq!(first.cpu_percent, None);
    assert_eq!(first.ram_percent, None);
    assert_eq!(first.disk_percent, None);
    assert_eq!(first.network_in_mbps, None);
    assert_eq!(first.load_average, None);
    assert_eq!(first.uptime_seconds, None);

    let second = &seen[1];
    assert!(second.cpu_percent.is_some());
    assert!(second.ram_percent.is_some());
    assert!(second.timestamp >= first.timestamp);

    assert!(stats.cycles() >= 2);
    assert_eq!(stats.failed(), 0);
    assert_eq!(*state.borrow(), LoopState::Idle);
}

#[tokio::test(start_paused = true)]
async fn delivery_failures_are_counted_not_fatal() {
    let cancel = CancellationToken::new();
    let handle = spawn(
        CollectorDeps {
            aggregator: aggregator(Arc::new(CountingSampler::default())),
            transport: Arc::new(AlwaysUnreachable),
            cancel: cancel.clone(),
        },
        config(),
    );
    while handle.stats.failed() < 3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cancel.cancel();
    let stats = handle.stats.clone();
    handle.stopped().await;
    assert_eq!(stats.delivered(), 0);
    assert!(stats.cycles() >= 3);
}

#[tokio::test(start_paused = true)]
async fn pull_transport_fills_history_store() {
    let history = Arc::new(HistoryStore::new(HistoryConfig {
        capacity: 3,
        ..HistoryConfig::default()
    }));
    let cancel = CancellationToken::new();
    let handle = spawn(
        CollectorDeps {
            aggregator: aggregator(Arc::new(CountingSampler::default())),
            transport: Arc::new(PullTransport::new(history.clone())),
            cancel: cancel.clone(),
        },
        config(),
    );
    while handle.stats.delivered() < 5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cancel.cancel();
    handle.stopped().await;
    assert_eq!(history.len().await, 3);
    assert!(history.latest().await.is_some_and(|s| s.cpu_percent.is_some()));
}

#[tokio::test]
async fn cancelled_before_first_tick_stops_promptly() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let handle = spawn(
        CollectorDeps {
            aggregator: aggregator(Arc::new(CountingSampler::default())),
            transport: Arc::new(AlwaysUnreachable),
            cancel,
        },
        CollectorConfig {
            interval: Duration::from_secs(60),
            stats_log_interval: Duration::from_secs(3600),
        },
    );
    tokio::time::timeout(Duration::from_secs(5), handle.join)
        .await
        .expect("collector should stop")
        .unwrap();
}

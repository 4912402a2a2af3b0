// Snapshot aggregator: samples every family concurrently and composes one MetricsSnapshot.
// A family that fails or overruns its timeout leaves its fields unknown; aggregate() never fails.

use crate::error::SampleError;
use crate::models::MetricsSnapshot;
use crate::sampler::Sampler;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub family_timeout: Duration,
    pub disk_mount: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            family_timeout: Duration::from_secs(3),
            disk_mount: "/".into(),
        }
    }
}

pub struct Aggregator {
    sampler: Arc<dyn Sampler>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(sampler: Arc<dyn Sampler>, config: AggregatorConfig) -> Self {
        Self { sampler, config }
    }

    pub fn sampler(&self) -> &Arc<dyn Sampler> {
        &self.sampler
    }

    pub async fn aggregate(&self) -> MetricsSnapshot {
        let timeout = self.config.family_timeout;
        let s = &self.sampler;
        let (cpu, memory, disk, network, info) = tokio::join!(
            bounded("cpu", timeout, s.sample_cpu()),
            bounded("memory", timeout, s.sample_memory()),
            bounded("disk", timeout, s.sample_disk(Some(self.config.disk_mount.as_str()))),
            bounded("network", timeout, s.sample_network()),
            bounded("system_info", timeout, s.sample_system_info()),
        );

        let mut snapshot = MetricsSnapshot::unknown(Utc::now());
        if let Some(cpu) = cpu {
            snapshot.cpu_percent = Some(cpu.cpu_percent);
            snapshot.cpu_cores = Some(cpu.cpu_cores);
            snapshot.load_average = Some(cpu.load_average);
        }
        if let Some(mem) = memory {
            snapshot.ram_used_gb = Some(mem.used_gb);
            snapshot.ram_total_gb = Some(mem.total_gb);
            snapshot.ram_percent = Some(mem.percent);
        }
        if let Some(disk) = disk {
            snapshot.disk_used_gb = Some(disk.used_gb);
            snapshot.disk_total_gb = Some(disk.total_gb);
            snapshot.disk_percent = Some(disk.percent);
        }
        if let Some(net) = network {
            snapshot.network_in_mbps = Some(net.in_mbps);
            snapshot.network_out_mbps = Some(net.out_mbps);
            snapshot.network_in_bytes = Some(net.in_bytes);
            snapshot.network_out_bytes = Some(net.out_bytes);
        }
        if let Some(info) = info {
            if !info.hostname.is_empty() {
                snapshot.hostname = Some(info.hostname);
            }
            snapshot.uptime_seconds = Some(info.uptime_seconds);
            snapshot.processes_count = Some(info.processes_count);
        }
        snapshot
    }
}

/// Runs one family under `timeout`; any failure is logged and becomes `None`.
async fn bounded<T>(
    family: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, SampleError>>,
) -> Option<T> {
    let err = match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => return Some(v),
        Ok(Err(e)) => e,
        Err(_) => SampleError::TimedOut {
            source_name: family,
            timeout_ms: timeout.as_millis() as u64,
        },
    };
    tracing::warn!(
        error = %err,
        family,
        operation = "aggregate",
        "metric family degraded to unknown"
    );
    None
}

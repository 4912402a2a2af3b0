// Metric samplers: one async read per metric family.
// `SysinfoSampler` reads the real host; `SimulatedSampler` produces deterministic demo data.

pub mod linux;
mod simulated;
mod sysinfo_sampler;

pub use simulated::SimulatedSampler;
pub use sysinfo_sampler::SysinfoSampler;

use crate::config::SamplerKind;
use crate::error::SampleError;
use crate::models::*;
use async_trait::async_trait;
use std::sync::Arc;

/// Process list is cut to the busiest N entries.
pub const TOP_PROCESSES: usize = 20;
/// Package list is cut to the first N entries in enumeration order.
pub const MAX_PACKAGES: usize = 50;

/// Reads current OS state. Every method is side-effect free from the caller's point of view;
/// unreadable items inside a family are skipped, an unreadable family returns `SourceUnavailable`.
#[async_trait]
pub trait Sampler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sample_cpu(&self) -> Result<CpuSample, SampleError>;

    async fn sample_memory(&self) -> Result<MemorySample, SampleError>;

    /// `mount` defaults to the root filesystem.
    async fn sample_disk(&self, mount: Option<&str>) -> Result<DiskSample, SampleError>;

    async fn sample_network(&self) -> Result<NetworkSample, SampleError>;

    async fn sample_processes(&self) -> Result<ProcessListing, SampleError>;

    /// Running and failed units only.
    async fn sample_services(&self) -> Result<Vec<ServiceRecord>, SampleError>;

    async fn sample_packages(&self) -> Result<Vec<InstalledApp>, SampleError>;

    async fn sample_system_info(&self) -> Result<HostInfo, SampleError>;
}

/// Builds the sampler selected in config.
pub fn from_kind(kind: SamplerKind) -> Arc<dyn Sampler> {
    match kind {
        SamplerKind::Sysinfo => Arc::new(SysinfoSampler::new()),
        SamplerKind::Simulated => Arc::new(SimulatedSampler::new()),
    }
}

/// Reads every pid with `read`, skipping the ones that fail, and keeps the top
/// [`TOP_PROCESSES`] by CPU. `total` is the size of the enumeration.
pub fn collect_process_records<I, F>(pids: I, mut read: F) -> ProcessListing
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u32) -> Result<ProcessRecord, SampleError>,
{
    let mut total = 0usize;
    let mut skipped = 0usize;
    let mut records = Vec::new();
    for pid in pids {
        total += 1;
        match read(pid) {
            Ok(r) => records.push(r),
            Err(e) => {
                skipped += 1;
                tracing::trace!(pid, error = %e, "process skipped");
            }
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, total, "some processes could not be read");
    }
    ProcessListing {
        total,
        top: top_by_cpu(records, TOP_PROCESSES),
    }
}

/// Sorts by CPU descending (ties: lower pid first) and truncates to `n`.
pub fn top_by_cpu(mut records: Vec<ProcessRecord>, n: usize) -> Vec<ProcessRecord> {
    records.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| a.pid.cmp(&b.pid))
    });
    records.truncate(n);
    records
}

/// Picks the entry whose mount point is `target` or, failing that, the longest mount point
/// that is a path prefix of `target`.
pub fn pick_mount<'a, T>(items: &'a [T], mount_of: impl Fn(&T) -> &str, target: &str) -> Option<&'a T> {
    items
        .iter()
        .filter(|item| is_path_prefix(mount_of(item), target))
        .max_by_key(|item| mount_of(item).len())
}

fn is_path_prefix(mount: &str, path: &str) -> bool {
    if mount == path || mount == "/" {
        return path.starts_with('/');
    }
    path.strip_prefix(mount)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

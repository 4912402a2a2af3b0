// Host sampler via sysinfo; services and packages via systemctl / dpkg-query.

use super::{MAX_PACKAGES, Sampler, collect_process_records, linux, pick_mount};
use crate::error::SampleError;
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::{
    Disks, Networks, Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users,
};
use tracing::instrument;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(4);

/// Last cumulative rx/tx totals and when they were read, for rate computation.
type NetworkBaseline = Option<(u64, u64, Instant)>;

pub struct SysinfoSampler {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
    users: Arc<Mutex<Users>>,
    last_network: Arc<Mutex<NetworkBaseline>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
    last_process_refresh: Arc<Mutex<Instant>>,
    command_timeout: Duration,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        // Per-process cpu is a delta between two refreshes; take the first one now
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            users: Arc::new(Mutex::new(Users::new_with_refreshed_list())),
            last_network: Arc::new(Mutex::new(None)),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
            last_process_refresh: Arc::new(Mutex::new(Instant::now())),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Bound for systemctl / dpkg-query runs.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Runs a blocking sysinfo read on the blocking pool.
async fn blocking<T, F>(source_name: &'static str, f: F) -> Result<T, SampleError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SampleError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SampleError::unavailable(source_name, format!("task join: {e}")))?
}

fn poisoned<E: std::fmt::Display>(source_name: &'static str) -> impl FnOnce(E) -> SampleError {
    move |e| SampleError::unavailable(source_name, format!("lock poisoned: {e}"))
}

/// How long to wait before a process refresh so its cpu delta spans the minimum interval.
fn process_settle_delay(since_last_refresh: Duration) -> Option<Duration> {
    sysinfo::MINIMUM_CPU_UPDATE_INTERVAL
        .checked_sub(since_last_refresh)
        .filter(|d| !d.is_zero())
}

fn map_status(status: sysinfo::ProcessStatus) -> ProcessStatus {
    use sysinfo::ProcessStatus as S;
    match status {
        S::Run => ProcessStatus::Running,
        S::Sleep | S::Idle | S::UninterruptibleDiskSleep => ProcessStatus::Sleeping,
        S::Stop | S::Tracing => ProcessStatus::Stopped,
        S::Zombie => ProcessStatus::Zombie,
        _ => ProcessStatus::Unknown,
    }
}

#[async_trait]
impl Sampler for SysinfoSampler {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_cpu"))]
    async fn sample_cpu(&self) -> Result<CpuSample, SampleError> {
        let sys = self.sys.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        blocking("cpu", move || {
            let mut sys = sys.lock().map_err(poisoned("cpu"))?;
            let mut guard = last_cpu_refresh.lock().map_err(poisoned("cpu"))?;

            let now = Instant::now();
            let usage = match *guard {
                Some((prev_ts, prev_usage))
                    if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                {
                    // Too soon for a meaningful delta; reuse the last reading
                    prev_usage
                }
                Some(_) => {
                    sys.refresh_cpu_all();
                    sys.global_cpu_usage() as f64
                }
                None => {
                    // First call: establish a baseline, then measure over the minimum interval
                    sys.refresh_cpu_all();
                    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                    sys.refresh_cpu_all();
                    sys.global_cpu_usage() as f64
                }
            };
            *guard = Some((Instant::now(), usage));

            let cores = sys.cpus().len() as u32;
            if cores == 0 {
                return Err(SampleError::unavailable("cpu", "no CPUs reported"));
            }
            let load = System::load_average();
            Ok(CpuSample {
                cpu_percent: round_dp(usage.clamp(0.0, 100.0), 1),
                cpu_cores: cores,
                load_average: LoadAverage::new(
                    round_dp(load.one, 2),
                    round_dp(load.five, 2),
                    round_dp(load.fifteen, 2),
                ),
            })
        })
        .await
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_memory"))]
    async fn sample_memory(&self) -> Result<MemorySample, SampleError> {
        let sys = self.sys.clone();
        blocking("memory", move || {
            let mut sys = sys.lock().map_err(poisoned("memory"))?;
            sys.refresh_memory();

            let total = sys.total_memory();
            if total == 0 {
                return Err(SampleError::unavailable("memory", "total memory reported as 0"));
            }
            let used = total.saturating_sub(sys.available_memory());
            Ok(MemorySample::from_bytes(used, total))
        })
        .await
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_disk"))]
    async fn sample_disk(&self, mount: Option<&str>) -> Result<DiskSample, SampleError> {
        let disks = self.disks.clone();
        let target = mount.unwrap_or("/").to_string();
        blocking("disk", move || {
            let mut disks = disks.lock().map_err(poisoned("disk"))?;
            disks.refresh(true);
            let mounts: Vec<(String, u64, u64)> = disks
                .list()
                .iter()
                .map(|d| {
                    (
                        d.mount_point().to_string_lossy().into_owned(),
                        d.total_space(),
                        d.available_space(),
                    )
                })
                .collect();
            let (mount_point, total, available) = pick_mount(&mounts, |m| m.0.as_str(), &target)
                .ok_or_else(|| {
                    SampleError::unavailable("disk", format!("no filesystem mounted at {target}"))
                })?;
            let used = total.saturating_sub(*available);
            Ok(DiskSample::from_bytes(mount_point.clone(), used, *total))
        })
        .await
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_network"))]
    async fn sample_network(&self) -> Result<NetworkSample, SampleError> {
        let networks = self.networks.clone();
        let last_network = self.last_network.clone();
        blocking("network", move || {
            let mut networks = networks.lock().map_err(poisoned("network"))?;
            networks.refresh(true);
            let (in_bytes, out_bytes) = networks
                .list()
                .iter()
                .filter(|(name, _)| name.as_str() != "lo")
                .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                    (
                        rx.saturating_add(data.total_received()),
                        tx.saturating_add(data.total_transmitted()),
                    )
                });

            let now = Instant::now();
            let mut guard = last_network.lock().map_err(poisoned("network"))?;
            let (in_mbps, out_mbps) = match *guard {
                Some((prev_in, prev_out, prev_ts)) => {
                    let dt = now.duration_since(prev_ts).as_secs_f64();
                    (
                        rate_mbps(prev_in, in_bytes, dt),
                        rate_mbps(prev_out, out_bytes, dt),
                    )
                }
                None => (0.0, 0.0),
            };
            *guard = Some((in_bytes, out_bytes, now));

            Ok(NetworkSample {
                in_bytes,
                out_bytes,
                in_mbps,
                out_mbps,
            })
        })
        .await
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_processes"))]
    async fn sample_processes(&self) -> Result<ProcessListing, SampleError> {
        let sys = self.sys.clone();
        let users = self.users.clone();
        let last_process_refresh = self.last_process_refresh.clone();
        blocking("processes", move || {
            let mut sys = sys.lock().map_err(poisoned("processes"))?;
            let users = users.lock().map_err(poisoned("processes"))?;
            let mut last = last_process_refresh.lock().map_err(poisoned("processes"))?;
            if let Some(delay) = process_settle_delay(last.elapsed()) {
                std::thread::sleep(delay);
            }
            sys.refresh_memory();
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing()
                    .with_cpu()
                    .with_memory()
                    .with_user(UpdateKind::OnlyIfNotSet),
            );
            *last = Instant::now();
            let total_memory = sys.total_memory();
            let cores = sys.cpus().len().max(1) as f64;
            let pids: Vec<u32> = sys.processes().keys().map(|p| p.as_u32()).collect();

            Ok(collect_process_records(pids, |pid| {
                let p = sys
                    .process(Pid::from_u32(pid))
                    .ok_or_else(|| SampleError::unavailable("process", "exited during scan"))?;
                let user = p
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|u| u.name().to_string())
                    .unwrap_or_else(|| "unknown".into());
                Ok(ProcessRecord {
                    pid,
                    name: p.name().to_string_lossy().into_owned(),
                    cpu_percent: round_dp((p.cpu_usage() as f64 / cores).clamp(0.0, 100.0), 1),
                    memory_percent: percent_of(p.memory(), total_memory),
                    status: map_status(p.status()),
                    user,
                })
            }))
        })
        .await
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_services"))]
    async fn sample_services(&self) -> Result<Vec<ServiceRecord>, SampleError> {
        let stdout = linux::run_command(
            "services",
            "systemctl",
            &[
                "list-units",
                "--type=service",
                "--state=running,failed",
                "--plain",
                "--no-legend",
            ],
            self.command_timeout,
        )
        .await?;
        Ok(linux::parse_systemctl_units(&stdout))
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_packages"))]
    async fn sample_packages(&self) -> Result<Vec<InstalledApp>, SampleError> {
        let stdout = linux::run_command(
            "packages",
            "dpkg-query",
            &["-W", "-f=${Package}\t${Version}\t${Installed-Size}\n"],
            self.command_timeout,
        )
        .await?;
        Ok(linux::parse_dpkg_query(&stdout, MAX_PACKAGES))
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample_system_info"))]
    async fn sample_system_info(&self) -> Result<HostInfo, SampleError> {
        let sys = self.sys.clone();
        blocking("system_info", move || {
            let mut sys = sys.lock().map_err(poisoned("system_info"))?;
            // Enumeration only; per-process details are refreshed by sample_processes.
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing(),
            );
            let boot_secs = System::boot_time();
            let boot_time = DateTime::<Utc>::from_timestamp(boot_secs as i64, 0)
                .ok_or_else(|| SampleError::unavailable("system_info", "invalid boot time"))?;
            let uptime_seconds = (Utc::now() - boot_time).num_seconds().max(0) as u64;
            Ok(HostInfo {
                hostname: System::host_name().unwrap_or_default(),
                os: linux::read_os_pretty_name()
                    .or_else(System::long_os_version)
                    .unwrap_or_else(|| std::env::consts::OS.into()),
                kernel: System::kernel_version()
                    .or_else(linux::read_kernel_release)
                    .unwrap_or_default(),
                architecture: std::env::consts::ARCH.into(),
                boot_time,
                uptime_seconds,
                processes_count: sys.processes().len() as u64,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_refresh_waits_out_minimum_interval() {
        let min = sysinfo::MINIMUM_CPU_UPDATE_INTERVAL;
        assert_eq!(process_settle_delay(Duration::ZERO), Some(min));
        assert_eq!(process_settle_delay(min), None);
        assert_eq!(process_settle_delay(min * 3), None);
        let half = min / 2;
        assert_eq!(process_settle_delay(half), Some(min - half));
    }

    #[tokio::test]
    async fn first_process_listing_follows_a_cpu_baseline() {
        let sampler = SysinfoSampler::new();
        let started = Instant::now();
        let listing = sampler.sample_processes().await.unwrap();
        assert!(listing.total >= 1);
        assert!(listing.top.len() <= listing.total);
        assert!(*sampler.last_process_refresh.lock().unwrap() >= started);
    }
}

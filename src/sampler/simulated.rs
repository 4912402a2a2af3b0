// Deterministic demo sampler: smooth synthetic values derived from a call counter.

use super::{MAX_PACKAGES, Sampler, TOP_PROCESSES, top_by_cpu};
use crate::error::SampleError;
use crate::models::*;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

const GB: u64 = 1024 * 1024 * 1024;
const SIM_INTERVAL_SECS: f64 = 5.0;

const PROCESSES: &[(&str, &str, f64, f64)] = &[
    ("nginx", "www-data", 0.5, 1.2),
    ("python3", "root", 2.5, 3.5),
    ("node", "node", 1.8, 4.2),
    ("mongod", "mongodb", 3.2, 8.5),
    ("redis-server", "redis", 0.3, 0.8),
    ("sshd", "root", 0.1, 0.2),
    ("systemd", "root", 0.2, 0.5),
    ("cron", "root", 0.0, 0.1),
    ("containerd", "root", 1.5, 2.8),
    ("uvicorn", "root", 0.8, 1.5),
];

const SERVICES: &[(&str, &str)] = &[
    ("nginx.service", "A high performance web server"),
    ("mongod.service", "MongoDB Database Server"),
    ("docker.service", "Docker Application Container Engine"),
    ("ssh.service", "OpenBSD Secure Shell server"),
    ("cron.service", "Regular background program processing"),
    ("ufw.service", "Uncomplicated firewall"),
    ("fail2ban.service", "Fail2Ban Service"),
    ("containerd.service", "containerd container runtime"),
];

const PACKAGES: &[(&str, &str, u64)] = &[
    ("nginx", "1.24.0-1", 1229),
    ("nodejs", "20.11.0", 46387),
    ("python3", "3.10.12", 24371),
    ("mongodb-org", "7.0.5", 182477),
    ("docker-ce", "25.0.3", 91648),
    ("certbot", "2.8.0", 8908),
    ("git", "2.43.0", 12697),
    ("vim", "9.0.2116", 3276),
    ("htop", "3.3.0", 307),
    ("fail2ban", "1.0.2", 2867),
    ("ufw", "0.36.2", 512),
];

/// Swappable stand-in for `SysinfoSampler`. Every read advances an internal tick; values follow
/// slow sine waves so dashboards show movement while staying reproducible.
pub struct SimulatedSampler {
    tick: AtomicU64,
    started: chrono::DateTime<Utc>,
}

impl Default for SimulatedSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSampler {
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
            started: Utc::now(),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}

/// Oscillates in [base - amp, base + amp] with the given period (in ticks).
fn wave(tick: u64, base: f64, amp: f64, period: f64) -> f64 {
    base + amp * (tick as f64 * std::f64::consts::TAU / period).sin()
}

#[async_trait]
impl Sampler for SimulatedSampler {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn sample_cpu(&self) -> Result<CpuSample, SampleError> {
        let t = self.next_tick();
        Ok(CpuSample {
            cpu_percent: round_dp(wave(t, 30.0, 15.0, 24.0).clamp(0.0, 100.0), 1),
            cpu_cores: 4,
            load_average: LoadAverage::new(
                round_dp(wave(t, 1.0, 0.8, 12.0), 2),
                round_dp(wave(t, 0.9, 0.5, 36.0), 2),
                round_dp(wave(t, 0.8, 0.3, 72.0), 2),
            ),
        })
    }

    async fn sample_memory(&self) -> Result<MemorySample, SampleError> {
        let t = self.current_tick();
        let total = 8 * GB;
        let used = (wave(t, 4.0, 1.5, 48.0) * GB as f64) as u64;
        Ok(MemorySample::from_bytes(used, total))
    }

    async fn sample_disk(&self, mount: Option<&str>) -> Result<DiskSample, SampleError> {
        let t = self.current_tick();
        let total = 80 * GB;
        // Disk fills slowly and never shrinks below the starting point.
        let used = 50 * GB + (t.min(10_000) * 1024 * 1024);
        Ok(DiskSample::from_bytes(mount.unwrap_or("/"), used, total))
    }

    async fn sample_network(&self) -> Result<NetworkSample, SampleError> {
        let t = self.current_tick();
        let in_mbps = round_dp(wave(t, 12.0, 10.0, 20.0), 2);
        let out_mbps = round_dp(wave(t, 7.0, 6.0, 30.0), 2);
        let bytes_per_tick = |mbps: f64| (mbps * 1_000_000.0 / 8.0 * SIM_INTERVAL_SECS) as u64;
        Ok(NetworkSample {
            in_bytes: t * bytes_per_tick(12.0),
            out_bytes: t * bytes_per_tick(7.0),
            in_mbps,
            out_mbps,
        })
    }

    async fn sample_processes(&self) -> Result<ProcessListing, SampleError> {
        let t = self.current_tick();
        let records: Vec<ProcessRecord> = PROCESSES
            .iter()
            .enumerate()
            .map(|(i, (name, user, cpu, mem))| ProcessRecord {
                pid: 1000 + (i as u32) * 37,
                name: (*name).to_string(),
                cpu_percent: round_dp(wave(t + i as u64, *cpu, cpu * 0.3, 10.0).max(0.0), 1),
                memory_percent: round_dp(*mem, 1),
                status: if (t + i as u64) % 3 == 0 {
                    ProcessStatus::Running
                } else {
                    ProcessStatus::Sleeping
                },
                user: (*user).to_string(),
            })
            .collect();
        Ok(ProcessListing {
            total: 80 + (t % 40) as usize,
            top: top_by_cpu(records, TOP_PROCESSES),
        })
    }

    async fn sample_services(&self) -> Result<Vec<ServiceRecord>, SampleError> {
        Ok(SERVICES
            .iter()
            .map(|(name, description)| ServiceRecord {
                name: (*name).to_string(),
                status: "active (running)".into(),
                active: true,
                description: (*description).to_string(),
            })
            .collect())
    }

    async fn sample_packages(&self) -> Result<Vec<InstalledApp>, SampleError> {
        Ok(PACKAGES
            .iter()
            .take(MAX_PACKAGES)
            .map(|(name, version, kb)| InstalledApp {
                name: (*name).to_string(),
                version: (*version).to_string(),
                size: super::linux::human_size_kb(*kb),
            })
            .collect())
    }

    async fn sample_system_info(&self) -> Result<HostInfo, SampleError> {
        let t = self.current_tick();
        let boot_time = self.started - ChronoDuration::days(3);
        Ok(HostInfo {
            hostname: "vps-simulated".into(),
            os: "Ubuntu 22.04.5 LTS".into(),
            kernel: "5.15.0-164-generic".into(),
            architecture: "x86_64".into(),
            boot_time,
            uptime_seconds: (Utc::now() - boot_time).num_seconds().max(0) as u64,
            processes_count: 80 + t % 40,
        })
    }
}

// Per-family sampler outputs, already rounded for the snapshot

use serde::{Deserialize, Serialize};

use super::LoadAverage;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Round to `decimals` places (half away from zero).
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / whole` as a percentage in [0, 100], rounded to 1 decimal. 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_dp((part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0), 1)
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    round_dp(bytes as f64 / BYTES_PER_GB, 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    pub cpu_percent: f64,
    pub cpu_cores: u32,
    pub load_average: LoadAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub used_gb: f64,
    pub total_gb: f64,
    pub percent: f64,
}

impl MemorySample {
    /// `used` is clamped to `total`.
    pub fn from_bytes(used: u64, total: u64) -> Self {
        let used = used.min(total);
        Self {
            used_gb: bytes_to_gb(used),
            total_gb: bytes_to_gb(total),
            percent: percent_of(used, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSample {
    pub mount: String,
    pub used_gb: f64,
    pub total_gb: f64,
    pub percent: f64,
}

impl DiskSample {
    /// `used` is clamped to `total`.
    pub fn from_bytes(mount: impl Into<String>, used: u64, total: u64) -> Self {
        let used = used.min(total);
        Self {
            mount: mount.into(),
            used_gb: bytes_to_gb(used),
            total_gb: bytes_to_gb(total),
            percent: percent_of(used, total),
        }
    }
}

/// Cumulative counters plus the rate since the previous sample of the same sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub in_mbps: f64,
    pub out_mbps: f64,
}

/// Megabits per second between two cumulative byte counters. Counter resets yield 0.
pub fn rate_mbps(prev_bytes: u64, now_bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    let delta = now_bytes.saturating_sub(prev_bytes) as f64;
    round_dp(delta * 8.0 / elapsed_secs / 1_000_000.0, 2)
}

// Metrics snapshot: one immutable record per collection cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1m / 5m / 15m load average. Serializes as a JSON array of exactly three numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 3]")]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    /// Negative or non-finite inputs are clamped to 0.
    pub fn new(one: f64, five: f64, fifteen: f64) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            one: clean(one),
            five: clean(five),
            fifteen: clean(fifteen),
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.one, self.five, self.fifteen]
    }
}

impl TryFrom<Vec<f64>> for LoadAverage {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [one, five, fifteen] => {
                if [one, five, fifteen].iter().any(|x| !x.is_finite() || **x < 0.0) {
                    return Err("load_average entries must be finite and >= 0".into());
                }
                Ok(Self {
                    one: *one,
                    five: *five,
                    fifteen: *fifteen,
                })
            }
            _ => Err(format!(
                "load_average must have exactly 3 entries, got {}",
                v.len()
            )),
        }
    }
}

impl From<LoadAverage> for [f64; 3] {
    fn from(l: LoadAverage) -> Self {
        l.as_array()
    }
}

/// One point-in-time view of the host. `None` marks a metric family that could not be sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub cpu_percent: Option<f64>,
    pub cpu_cores: Option<u32>,
    pub ram_used_gb: Option<f64>,
    pub ram_total_gb: Option<f64>,
    pub ram_percent: Option<f64>,
    pub disk_used_gb: Option<f64>,
    pub disk_total_gb: Option<f64>,
    pub disk_percent: Option<f64>,
    pub network_in_mbps: Option<f64>,
    pub network_out_mbps: Option<f64>,
    #[serde(default)]
    pub network_in_bytes: Option<u64>,
    #[serde(default)]
    pub network_out_bytes: Option<u64>,
    pub uptime_seconds: Option<u64>,
    pub load_average: Option<LoadAverage>,
    pub processes_count: Option<u64>,
}

/// Reason a pushed snapshot was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be within [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be finite and >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{used_field} ({used}) exceeds {total_field} ({total})")]
    UsedExceedsTotal {
        used_field: &'static str,
        used: f64,
        total_field: &'static str,
        total: f64,
    },
    #[error("cpu_cores must be positive")]
    ZeroCores,
    #[error("timestamp {timestamp} is ahead of server time by more than {tolerance_secs}s")]
    FromFuture {
        timestamp: DateTime<Utc>,
        tolerance_secs: i64,
    },
}

impl MetricsSnapshot {
    /// Snapshot with every metric unknown.
    pub fn unknown(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            hostname: None,
            cpu_percent: None,
            cpu_cores: None,
            ram_used_gb: None,
            ram_total_gb: None,
            ram_percent: None,
            disk_used_gb: None,
            disk_total_gb: None,
            disk_percent: None,
            network_in_mbps: None,
            network_out_mbps: None,
            network_in_bytes: None,
            network_out_bytes: None,
            uptime_seconds: None,
            load_average: None,
            processes_count: None,
        }
    }

    /// Checks percent bounds, used <= total, and non-negative sizes and rates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("cpu_percent", self.cpu_percent),
            ("ram_percent", self.ram_percent),
            ("disk_percent", self.disk_percent),
        ] {
            if let Some(v) = value
                && !(0.0..=100.0).contains(&v)
            {
                return Err(ValidationError::PercentOutOfRange { field, value: v });
            }
        }
        for (field, value) in [
            ("ram_used_gb", self.ram_used_gb),
            ("ram_total_gb", self.ram_total_gb),
            ("disk_used_gb", self.disk_used_gb),
            ("disk_total_gb", self.disk_total_gb),
            ("network_in_mbps", self.network_in_mbps),
            ("network_out_mbps", self.network_out_mbps),
        ] {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(ValidationError::Negative { field, value: v });
            }
        }
        check_used_total("ram_used_gb", self.ram_used_gb, "ram_total_gb", self.ram_total_gb)?;
        check_used_total(
            "disk_used_gb",
            self.disk_used_gb,
            "disk_total_gb",
            self.disk_total_gb,
        )?;
        if self.cpu_cores == Some(0) {
            return Err(ValidationError::ZeroCores);
        }
        Ok(())
    }

    /// Rejects timestamps later than `now + tolerance`. A future-dated entry would sort
    /// last in history and shadow every later snapshot as the latest.
    pub fn check_not_future(
        &self,
        now: DateTime<Utc>,
        tolerance: chrono::Duration,
    ) -> Result<(), ValidationError> {
        if self.timestamp > now + tolerance {
            return Err(ValidationError::FromFuture {
                timestamp: self.timestamp,
                tolerance_secs: tolerance.num_seconds(),
            });
        }
        Ok(())
    }
}

fn check_used_total(
    used_field: &'static str,
    used: Option<f64>,
    total_field: &'static str,
    total: Option<f64>,
) -> Result<(), ValidationError> {
    if let (Some(used), Some(total)) = (used, total)
        && used > total
    {
        return Err(ValidationError::UsedExceedsTotal {
            used_field,
            used,
            total_field,
            total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> MetricsSnapshot {
        MetricsSnapshot {
            cpu_percent: Some(12.5),
            cpu_cores: Some(4),
            ram_used_gb: Some(3.2),
            ram_total_gb: Some(8.0),
            ram_percent: Some(40.0),
            disk_used_gb: Some(50.1),
            disk_total_gb: Some(80.0),
            disk_percent: Some(62.6),
            network_in_mbps: Some(1.25),
            network_out_mbps: Some(0.5),
            uptime_seconds: Some(3600),
            load_average: Some(LoadAverage::new(0.5, 0.4, 0.3)),
            processes_count: Some(120),
            ..MetricsSnapshot::unknown(Utc::now())
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        assert!(full().validate().is_ok());
        assert!(MetricsSnapshot::unknown(Utc::now()).validate().is_ok());
    }

    #[test]
    fn percent_out_of_range_rejected() {
        let mut s = full();
        s.disk_percent = Some(100.1);
        assert!(matches!(
            s.validate(),
            Err(ValidationError::PercentOutOfRange {
                field: "disk_percent",
                ..
            })
        ));
    }

    #[test]
    fn used_above_total_rejected() {
        let mut s = full();
        s.ram_used_gb = Some(9.0);
        assert!(matches!(
            s.validate(),
            Err(ValidationError::UsedExceedsTotal { .. })
        ));
    }

    #[test]
    fn future_timestamp_beyond_tolerance_rejected() {
        let now = Utc::now();
        let tolerance = chrono::Duration::seconds(60);
        let mut s = full();
        s.timestamp = now + chrono::Duration::seconds(30);
        assert!(s.check_not_future(now, tolerance).is_ok());
        s.timestamp = now - chrono::Duration::days(1);
        assert!(s.check_not_future(now, tolerance).is_ok());
        s.timestamp = now + chrono::Duration::days(365);
        assert!(matches!(
            s.check_not_future(now, tolerance),
            Err(ValidationError::FromFuture {
                tolerance_secs: 60,
                ..
            })
        ));
    }

    #[test]
    fn load_average_requires_three_entries() {
        assert!(serde_json::from_str::<LoadAverage>("[0.1, 0.2]").is_err());
        assert!(serde_json::from_str::<LoadAverage>("[0.1, 0.2, 0.3, 0.4]").is_err());
        assert!(serde_json::from_str::<LoadAverage>("[0.1, -0.2, 0.3]").is_err());
        let l: LoadAverage = serde_json::from_str("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!(l.as_array(), [0.1, 0.2, 0.3]);
        assert_eq!(serde_json::to_string(&l).unwrap(), "[0.1,0.2,0.3]");
    }

    #[test]
    fn load_average_new_clamps_negative() {
        let l = LoadAverage::new(-1.0, f64::NAN, 2.0);
        assert_eq!(l.as_array(), [0.0, 0.0, 2.0]);
    }

    #[test]
    fn unknown_fields_serialize_as_null() {
        let json = serde_json::to_value(MetricsSnapshot::unknown(Utc::now())).unwrap();
        assert!(json["cpu_percent"].is_null());
        assert!(json["load_average"].is_null());
    }
}

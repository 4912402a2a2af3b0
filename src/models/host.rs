// Process, service, package and host identity records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process scheduler state; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: ProcessStatus,
    pub user: String,
}

/// Top processes plus the size of the full enumeration they were picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessListing {
    pub total: usize,
    pub top: Vec<ProcessRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub status: String,
    pub active: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub name: String,
    pub version: String,
    pub size: String,
}

/// Host identity and boot-derived counters (GET /vps/info).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub architecture: String,
    pub boot_time: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub processes_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_unknown_string_deserializes_to_unknown() {
        let s: ProcessStatus = serde_json::from_str("\"parked\"").unwrap();
        assert_eq!(s, ProcessStatus::Unknown);
        assert_eq!(
            serde_json::to_string(&ProcessStatus::Zombie).unwrap(),
            "\"zombie\""
        );
    }
}

// Linux-specific helpers: /etc/os-release, /proc, systemctl and dpkg-query output parsing.

use crate::error::SampleError;
use crate::models::{InstalledApp, ServiceRecord};
use std::time::Duration;

/// Read distro name from /etc/os-release (PRETTY_NAME, falling back to NAME).
pub fn read_os_pretty_name() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/etc/os-release").ok()?;
        parse_os_release(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

pub fn parse_os_release(content: &str) -> Option<String> {
    for key in ["PRETTY_NAME=", "NAME="] {
        for line in content.lines() {
            if let Some(v) = line.strip_prefix(key) {
                let v = v.trim().trim_matches('"');
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Kernel release from /proc (e.g. "5.15.0-164-generic").
pub fn read_kernel_release() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
        let v = v.trim();
        if v.is_empty() {
            return None;
        }
        Some(v.to_string())
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Runs an external command with a hard timeout and returns its stdout.
/// A missing binary (no systemd, no dpkg) maps to `SourceUnavailable`.
pub async fn run_command(
    source_name: &'static str,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, SampleError> {
    let child = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();
    let output = match tokio::time::timeout(timeout, child).await {
        Err(_) => {
            return Err(SampleError::TimedOut {
                source_name,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SampleError::unavailable(
                source_name,
                format!("{program} not found"),
            ));
        }
        Ok(Err(e)) => return Err(SampleError::unavailable(source_name, e)),
        Ok(Ok(output)) => output,
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SampleError::unavailable(
            source_name,
            format!("{program} exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `systemctl list-units --type=service --state=running,failed --plain --no-legend`.
/// Columns: UNIT LOAD ACTIVE SUB DESCRIPTION... Lines with fewer than four columns are skipped.
pub fn parse_systemctl_units(stdout: &str) -> Vec<ServiceRecord> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts: Vec<&str> = line.split_whitespace().collect();
            // Failed units may carry a status bullet even with --plain.
            if parts.first().is_some_and(|p| *p == "●" || *p == "*") {
                parts.remove(0);
            }
            if parts.len() < 4 {
                return None;
            }
            let name = parts[0];
            let active_state = parts[2];
            let sub_state = parts[3];
            let description = if parts.len() > 4 {
                parts[4..].join(" ")
            } else {
                name.to_string()
            };
            Some(ServiceRecord {
                name: name.to_string(),
                status: format!("{active_state} ({sub_state})"),
                active: sub_state == "running",
                description,
            })
        })
        .collect()
}

/// Parse `dpkg-query -W -f='${Package}\t${Version}\t${Installed-Size}\n'`, keeping the first
/// `limit` well-formed lines.
pub fn parse_dpkg_query(stdout: &str, limit: usize) -> Vec<InstalledApp> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let name = parts.next()?.trim();
            let version = parts.next()?.trim();
            let size = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let size_kb = size.parse::<u64>().unwrap_or(0);
            Some(InstalledApp {
                name: name.to_string(),
                version: version.to_string(),
                size: human_size_kb(size_kb),
            })
        })
        .take(limit)
        .collect()
}

/// dpkg reports Installed-Size in KiB.
pub fn human_size_kb(kb: u64) -> String {
    if kb > 1024 {
        format!("{:.1} MB", kb as f64 / 1024.0)
    } else {
        format!("{kb} KB")
    }
}

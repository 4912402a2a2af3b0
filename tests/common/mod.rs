// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use vpsmon::config::AppConfig;
use vpsmon::error::SampleError;
use vpsmon::history_store::HistoryStore;
use vpsmon::models::*;
use vpsmon::sampler::{Sampler, SimulatedSampler};

pub const AGENT_TOKEN: &str = "agent-token-for-tests";

const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "127.0.0.1"

[database]
path = "__DB_PATH__"
max_pool_size = 2

[auth]
jwt_secret = "test-secret-0123456789abcdef"
token_ttl_secs = 3600
bcrypt_cost = 4
agent_tokens = ["agent-token-for-tests"]

[history]
capacity = 500
max_window_hours = 6
max_points = 72

[collector]
enabled = false
sampler = "simulated"

[api]
request_timeout_ms = 2000
"#;

pub fn test_app_config(db_path: &str) -> AppConfig {
    AppConfig::load_from_str(&TEST_CONFIG.replace("__DB_PATH__", db_path)).unwrap()
}

/// A snapshot that passes validation.
pub fn snapshot_at(timestamp: DateTime<Utc>) -> MetricsSnapshot {
    let mut s = MetricsSnapshot::unknown(timestamp);
    s.hostname = Some("test-host".into());
    s.cpu_percent = Some(12.5);
    s.cpu_cores = Some(4);
    s.ram_used_gb = Some(3.2);
    s.ram_total_gb = Some(8.0);
    s.ram_percent = Some(40.0);
    s.disk_used_gb = Some(20.0);
    s.disk_total_gb = Some(80.0);
    s.disk_percent = Some(25.0);
    s.network_in_mbps = Some(1.25);
    s.network_out_mbps = Some(0.5);
    s.uptime_seconds = Some(3600);
    s.load_average = Some(LoadAverage::new(0.5, 0.4, 0.3));
    s.processes_count = Some(120);
    s
}

/// Simulated sampler that counts every call and can be switched to fail every family.
#[derive(Default)]
pub struct CountingSampler {
    inner: SimulatedSampler,
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl CountingSampler {
    pub fn failing() -> Self {
        let s = Self::default();
        s.failing.store(true, Ordering::SeqCst);
        s
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, family: &'static str) -> Result<(), SampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SampleError::unavailable(family, "set to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl Sampler for CountingSampler {
    fn name(&self) -> &'static str {
        "counting"
    }
    async fn sample_cpu(&self) -> Result<CpuSample, SampleError> {
        self.enter("cpu")?;
        self.inner.sample_cpu().await
    }
    async fn sample_memory(&self) -> Result<MemorySample, SampleError> {
        self.enter("memory")?;
        self.inner.sample_memory().await
    }
    async fn sample_disk(&self, mount: Option<&str>) -> Result<DiskSample, SampleError> {
        self.enter("disk")?;
        self.inner.sample_disk(mount).await
    }
    async fn sample_network(&self) -> Result<NetworkSample, SampleError> {
        self.enter("network")?;
        self.inner.sample_network().await
    }
    async fn sample_processes(&self) -> Result<ProcessListing, SampleError> {
        self.enter("processes")?;
        self.inner.sample_processes().await
    }
    async fn sample_services(&self) -> Result<Vec<ServiceRecord>, SampleError> {
        self.enter("services")?;
        self.inner.sample_services().await
    }
    async fn sample_packages(&self) -> Result<Vec<InstalledApp>, SampleError> {
        self.enter("packages")?;
        self.inner.sample_packages().await
    }
    async fn sample_system_info(&self) -> Result<HostInfo, SampleError> {
        self.enter("system_info")?;
        self.inner.sample_system_info().await
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub history: Arc<HistoryStore>,
    pub sampler: Arc<CountingSampler>,
    pub config: AppConfig,
    _dir: TempDir,
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("vpsmon.db");
    let config = test_app_config(db_path.to_str().unwrap());
    let pool = vpsmon::db::connect(&config.database.path, config.database.max_pool_size)
        .await
        .unwrap();
    vpsmon::db::init(&pool).await.unwrap();
    let history = Arc::new(HistoryStore::new(config.history.history_config()));
    let sampler = Arc::new(CountingSampler::default());
    let app = vpsmon::routes::app(history.clone(), sampler.clone(), pool, config.clone());
    TestApp {
        server: TestServer::new(app),
        history,
        sampler,
        config,
        _dir: dir,
    }
}

/// Registers `username` and returns its bearer token.
pub async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/auth/register")
        .json(&serde_json::json!({ "username": username, "password": "matrix-password" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

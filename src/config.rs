use serde::Deserialize;
use std::time::Duration;

use crate::aggregator::AggregatorConfig;
use crate::history_store::HistoryConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub collector: CollectorSection,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Static bearer tokens accepted on POST /metrics/push.
    #[serde(default)]
    pub agent_tokens: Vec<String>,
}

fn default_token_ttl_secs() -> u64 {
    24 * 3600
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
    #[serde(default = "default_max_window_hours")]
    pub max_window_hours: u32,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_history_capacity() -> usize {
    // 6 hours at the default 5s cadence
    4320
}

fn default_max_window_hours() -> u32 {
    6
}

fn default_max_points() -> usize {
    72
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            max_window_hours: default_max_window_hours(),
            max_points: default_max_points(),
        }
    }
}

impl HistorySection {
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            capacity: self.capacity,
            max_window: Duration::from_secs(u64::from(self.max_window_hours) * 3600),
            max_points: self.max_points,
        }
    }
}

/// Which Sampler implementation feeds the collection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    Sysinfo,
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorSection {
    /// Backend only: run an in-process collection loop that samples this host.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sampler")]
    pub sampler: SamplerKind,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per metric family; a slower family degrades to unknown for that cycle.
    #[serde(default = "default_family_timeout_ms")]
    pub family_timeout_ms: u64,
    #[serde(default = "default_disk_mount")]
    pub disk_mount: String,
    /// How often to log collector stats (real seconds).
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_sampler() -> SamplerKind {
    SamplerKind::Sysinfo
}

fn default_interval_secs() -> u64 {
    5
}

fn default_family_timeout_ms() -> u64 {
    3000
}

fn default_disk_mount() -> String {
    "/".into()
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sampler: default_sampler(),
            interval_secs: default_interval_secs(),
            family_timeout_ms: default_family_timeout_ms(),
            disk_mount: default_disk_mount(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

impl CollectorSection {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            family_timeout: Duration::from_millis(self.family_timeout_ms),
            disk_mount: self.disk_mount.clone(),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.interval_secs > 0,
            "collector.interval_secs must be > 0, got {}",
            self.interval_secs
        );
        anyhow::ensure!(
            self.family_timeout_ms > 0,
            "collector.family_timeout_ms must be > 0, got {}",
            self.family_timeout_ms
        );
        anyhow::ensure!(
            self.family_timeout_ms < self.interval_secs * 1000,
            "collector.family_timeout_ms ({}) must be shorter than collector.interval_secs ({}s)",
            self.family_timeout_ms,
            self.interval_secs
        );
        anyhow::ensure!(
            self.disk_mount.starts_with('/'),
            "collector.disk_mount must be an absolute path, got {:?}",
            self.disk_mount
        );
        anyhow::ensure!(
            self.stats_log_interval_secs > 0,
            "collector.stats_log_interval_secs must be > 0, got {}",
            self.stats_log_interval_secs
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Upper bound for live sampling done inside a request (/processes, /services, /apps).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.auth.jwt_secret.len() >= 16,
            "auth.jwt_secret must be at least 16 characters"
        );
        anyhow::ensure!(
            self.auth.token_ttl_secs > 0,
            "auth.token_ttl_secs must be > 0, got {}",
            self.auth.token_ttl_secs
        );
        anyhow::ensure!(
            (4..=31).contains(&self.auth.bcrypt_cost),
            "auth.bcrypt_cost must be between 4 and 31, got {}",
            self.auth.bcrypt_cost
        );
        anyhow::ensure!(
            self.auth.agent_tokens.iter().all(|t| !t.is_empty()),
            "auth.agent_tokens must not contain empty tokens"
        );
        anyhow::ensure!(
            self.history.capacity > 0,
            "history.capacity must be > 0, got {}",
            self.history.capacity
        );
        anyhow::ensure!(
            self.history.max_window_hours > 0,
            "history.max_window_hours must be > 0, got {}",
            self.history.max_window_hours
        );
        anyhow::ensure!(
            self.history.max_points > 0,
            "history.max_points must be > 0, got {}",
            self.history.max_points
        );
        anyhow::ensure!(
            self.api.request_timeout_ms > 0,
            "api.request_timeout_ms must be > 0, got {}",
            self.api.request_timeout_ms
        );
        self.collector.validate()
    }
}

/// Agent delivery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Push,
    Pull,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub collector: CollectorSection,
    pub transport: TransportSection,
    pub push: Option<PushConfig>,
    pub pull: Option<PullConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportSection {
    pub mode: TransportMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Backend base URL, e.g. "https://monitor.example.com/api".
    pub backend_url: String,
    pub token: String,
    #[serde(default = "default_push_timeout_ms")]
    pub timeout_ms: u64,
    /// 1 = no retry inside a cycle; the next cycle is the retry boundary.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_push_timeout_ms() -> u64 {
    4000
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullConfig {
    pub host: String,
    pub port: u16,
    pub token: String,
    #[serde(default)]
    pub history: HistorySection,
}

impl AgentConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("AGENT_CONFIG_FILE").unwrap_or_else(|_| "agent.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AgentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.collector.validate()?;
        match self.transport.mode {
            TransportMode::Push => {
                let Some(push) = &self.push else {
                    anyhow::bail!("transport.mode = \"push\" requires a [push] section");
                };
                anyhow::ensure!(
                    push.backend_url.starts_with("http://")
                        || push.backend_url.starts_with("https://"),
                    "push.backend_url must start with http:// or https://, got {:?}",
                    push.backend_url
                );
                anyhow::ensure!(!push.token.is_empty(), "push.token must be non-empty");
                anyhow::ensure!(
                    push.timeout_ms > 0,
                    "push.timeout_ms must be > 0, got {}",
                    push.timeout_ms
                );
                anyhow::ensure!(
                    push.max_attempts > 0,
                    "push.max_attempts must be > 0, got {}",
                    push.max_attempts
                );
                // All attempts of one cycle must fit inside one interval.
                let worst_case_ms = u64::from(push.max_attempts)
                    * (push.timeout_ms + push.retry_delay_ms);
                anyhow::ensure!(
                    worst_case_ms <= self.collector.interval_secs * 1000,
                    "push.max_attempts * (timeout_ms + retry_delay_ms) = {}ms is too long for collector.interval_secs = {}",
                    worst_case_ms,
                    self.collector.interval_secs
                );
            }
            TransportMode::Pull => {
                let Some(pull) = &self.pull else {
                    anyhow::bail!("transport.mode = \"pull\" requires a [pull] section");
                };
                anyhow::ensure!(
                    pull.port > 0,
                    "pull.port must be between 1 and 65535, got {}",
                    pull.port
                );
                anyhow::ensure!(!pull.token.is_empty(), "pull.token must be non-empty");
                anyhow::ensure!(
                    pull.history.capacity > 0 && pull.history.max_points > 0,
                    "pull.history.capacity and pull.history.max_points must be > 0"
                );
            }
        }
        Ok(())
    }
}

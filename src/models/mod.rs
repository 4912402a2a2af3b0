// Domain models shared by the agent and the backend

mod host;
mod preferences;
mod sample;
mod snapshot;

pub use host::{HostInfo, InstalledApp, ProcessListing, ProcessRecord, ProcessStatus, ServiceRecord};
pub use preferences::{
    MetricCategory, MetricPreference, PreferenceUpdate, PreferencesUpdateRequest,
    UserPreferenceSet,
};
pub use sample::{
    CpuSample, DiskSample, MemorySample, NetworkSample, bytes_to_gb, percent_of, rate_mbps,
    round_dp,
};
pub use snapshot::{LoadAverage, MetricsSnapshot, ValidationError};

// Live host listings sampled per request, bounded by the API request timeout.

use axum::Json;
use axum::extract::State;
use std::future::Future;
use std::time::Duration;

use super::AppState;
use crate::error::{ApiError, SampleError};
use crate::models::{HostInfo, InstalledApp, ProcessRecord, ServiceRecord};

async fn sample_live<T>(
    state: &AppState,
    source_name: &'static str,
    fut: impl Future<Output = Result<T, SampleError>>,
) -> Result<T, ApiError> {
    let timeout = Duration::from_millis(state.config.api.request_timeout_ms);
    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(r) => r,
        Err(_) => Err(SampleError::TimedOut {
            source_name,
            timeout_ms: state.config.api.request_timeout_ms,
        }),
    };
    result.map_err(|e| {
        tracing::warn!(error = %e, operation = source_name, "live sampling failed");
        ApiError::from(e)
    })
}

/// GET /processes: top processes by CPU.
pub(super) async fn processes_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProcessRecord>>, ApiError> {
    let listing = sample_live(&state, "processes", state.sampler.sample_processes()).await?;
    Ok(Json(listing.top))
}

/// GET /services
pub(super) async fn services_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceRecord>>, ApiError> {
    Ok(Json(
        sample_live(&state, "services", state.sampler.sample_services()).await?,
    ))
}

/// GET /apps
pub(super) async fn apps_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<InstalledApp>>, ApiError> {
    Ok(Json(
        sample_live(&state, "packages", state.sampler.sample_packages()).await?,
    ))
}

/// GET /vps/info
pub(super) async fn vps_info_handler(
    State(state): State<AppState>,
) -> Result<Json<HostInfo>, ApiError> {
    Ok(Json(
        sample_live(&state, "system_info", state.sampler.sample_system_info()).await?,
    ))
}

// Snapshot endpoints: latest, history window, agent push ingestion

use axum::Json;
use axum::extract::{Query, State};
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;
use crate::history_store::HistoryStore;
use crate::models::MetricsSnapshot;

/// How far ahead of server time a pushed snapshot may be stamped.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
pub(super) struct HistoryParams {
    hours: Option<i64>,
}

/// Requested hours clamped to [1, max window].
pub(crate) fn clamp_hours(requested: Option<i64>, max_window_hours: i64) -> i64 {
    requested.unwrap_or(1).clamp(1, max_window_hours.max(1))
}

/// GET /metrics/current
pub(super) async fn current_handler(
    State(history): State<Arc<HistoryStore>>,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    history
        .latest()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::Unavailable("no snapshot collected yet".into()))
}

/// GET /metrics/history?hours=N
pub(super) async fn history_handler(
    State(history): State<Arc<HistoryStore>>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<MetricsSnapshot>> {
    let max_hours = (history.config().max_window.as_secs() / 3600) as i64;
    let hours = clamp_hours(params.hours, max_hours);
    let until = Utc::now();
    let since = until - chrono::Duration::hours(hours);
    let max_points = history.config().max_points;
    Json(history.query(since, until, max_points).await)
}

/// POST /metrics/push: one snapshot from an agent.
pub(super) async fn push_handler(
    State(state): State<AppState>,
    body: Result<Json<MetricsSnapshot>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(snapshot) = body.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    snapshot
        .validate()
        .and_then(|()| {
            snapshot.check_not_future(Utc::now(), chrono::Duration::seconds(MAX_CLOCK_SKEW_SECS))
        })
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    let evicted = state.history.append(snapshot).await;
    if evicted > 0 {
        tracing::debug!(evicted, operation = "push", "history at capacity");
    }
    let stored = state.history.len().await;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "stored": stored,
    })))
}

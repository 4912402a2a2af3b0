// Public probes: root banner, health, version

use axum::response::IntoResponse;

use crate::version::{NAME, VERSION};

/// GET /: liveness banner.
pub(super) async fn root_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "message": "VPS Monitor API",
        "status": "online",
    }))
}

/// GET /health
pub(super) async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

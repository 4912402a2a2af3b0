// Per-user metric visibility

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};

use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{PreferencesUpdateRequest, UserPreferenceSet};
use crate::preferences_repo::PreferencesError;

/// GET /preferences
pub(super) async fn get_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserPreferenceSet>, ApiError> {
    Ok(Json(state.prefs.get(user.id).await?))
}

/// PUT /preferences: merge by id, return the full resulting set.
pub(super) async fn put_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<PreferencesUpdateRequest>, JsonRejection>,
) -> Result<Json<UserPreferenceSet>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let set = match state.prefs.update(user.id, &req.preferences).await {
        Ok(set) => set,
        Err(PreferencesError::UnknownUser) => {
            return Err(ApiError::unauthorized("user no longer exists"));
        }
        Err(PreferencesError::Other(e)) => return Err(e.into()),
    };
    tracing::debug!(
        user = %user.username,
        updates_count = req.preferences.len(),
        "preferences updated"
    );
    Ok(Json(set))
}

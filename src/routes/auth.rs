// Account registration and login; both return a bearer token.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;
use crate::user_repo::{User, UserError};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub(super) struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TokenResponse {
    token: String,
    token_type: &'static str,
    expires_in: u64,
}

fn token_for(state: &AppState, user: &User) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.auth.issue(user.id, &user.username)?;
    Ok(Json(TokenResponse {
        token,
        token_type: "bearer",
        expires_in: state.auth.token_ttl_secs(),
    }))
}

fn credentials(body: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    let Json(mut creds) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    creds.username = creds.username.trim().to_string();
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    }
    Ok(creds)
}

/// POST /auth/register
pub(super) async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let creds = credentials(body)?;
    let len = creds.username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "username must be {MIN_USERNAME_LEN} to {MAX_USERNAME_LEN} characters"
        )));
    }
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let user = match state.users.register(&creds.username, &creds.password).await {
        Ok(u) => u,
        Err(UserError::UsernameTaken) => {
            return Err(ApiError::Conflict("username already taken".into()));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };
    tracing::info!(user = %user.username, "account registered");
    token_for(&state, &user)
}

/// POST /auth/login
pub(super) async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let creds = credentials(body)?;
    let user = match state.users.authenticate(&creds.username, &creds.password).await {
        Ok(u) => u,
        Err(UserError::InvalidCredentials) => {
            return Err(ApiError::unauthorized("invalid credentials"));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };
    token_for(&state, &user)
}

// Auth gate: JWT bearer tokens for dashboard users, static bearer tokens for agents.
// Both middlewares reject before any handler (and so before any sampling) runs.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

/// Authenticated dashboard user, inserted as a request extension by [`require_user`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

pub struct AuthGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl_secs: u64,
}

impl AuthGate {
    pub fn new(secret: &str, token_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_secs,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }

    pub fn issue(&self, user_id: i64, username: &str) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::AuthRejected {
                    code: "TOKEN_EXPIRED",
                    message: "token expired".into(),
                },
                _ => ApiError::unauthorized("invalid token"),
            })?
            .claims;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::unauthorized("invalid token subject"))?;
        Ok(AuthUser {
            id,
            username: claims.username,
        })
    }
}

/// Fixed set of accepted bearer tokens (agent push, agent pull endpoint).
pub struct StaticTokens(Vec<String>);

impl StaticTokens {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self(tokens.into_iter().filter(|t| !t.is_empty()).collect())
    }

    pub fn accepts(&self, token: &str) -> bool {
        // Check every entry so timing does not reveal which one matched
        self.0
            .iter()
            .fold(false, |found, t| constant_time_eq(t, token) | found)
    }
}

/// Compares all bytes regardless of where the first mismatch is.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn bearer_token(req: &Request<Body>) -> Result<&str, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid authorization header"))?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::unauthorized("invalid authorization header")),
    }
}

pub async fn require_user(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = gate.verify(bearer_token(&req)?)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_static_token(
    State(tokens): State<Arc<StaticTokens>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !tokens.accepts(bearer_token(&req)?) {
        return Err(ApiError::unauthorized("invalid token"));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-0123456789";

    #[test]
    fn issued_token_verifies() {
        let gate = AuthGate::new(SECRET, 3600);
        let token = gate.issue(42, "neo").unwrap();
        let user = gate.verify(&token).unwrap();
        assert_eq!(
            user,
            AuthUser {
                id: 42,
                username: "neo".into()
            }
        );
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = AuthGate::new("another-secret-abcdefghij", 3600)
            .issue(1, "x")
            .unwrap();
        let err = AuthGate::new(SECRET, 3600).verify(&token).unwrap_err();
        assert!(matches!(
            err,
            ApiError::AuthRejected {
                code: "UNAUTHORIZED",
                ..
            }
        ));
    }

    #[test]
    fn expired_token_has_distinct_code() {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "1".into(),
            username: "x".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = AuthGate::new(SECRET, 3600).verify(&token).unwrap_err();
        assert!(matches!(
            err,
            ApiError::AuthRejected {
                code: "TOKEN_EXPIRED",
                ..
            }
        ));
    }

    #[test]
    fn static_tokens_match_exactly() {
        let tokens = StaticTokens::new(vec!["agent-a".to_string(), String::new()]);
        assert!(tokens.accepts("agent-a"));
        assert!(!tokens.accepts("agent-b"));
        assert!(!tokens.accepts("agent-"));
        assert!(!tokens.accepts(""));
    }
}

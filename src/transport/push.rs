// Push mode: POST each snapshot as JSON to `{backend_url}/metrics/push` with a bearer token.

use super::{DeliveryResult, Transport};
use crate::error::DeliveryError;
use crate::models::MetricsSnapshot;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::instrument;

pub struct PushTransport {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl PushTransport {
    /// `backend_url` is the API base; a trailing slash is tolerated.
    pub fn new(backend_url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/metrics/push", backend_url.trim_end_matches('/')),
            token: token.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, snapshot: &MetricsSnapshot) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(snapshot).map_err(|e| DeliveryError::Encode(e.to_string()))?;
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DeliveryError::AuthRejected(status))
            }
            _ => Err(DeliveryError::Status(status)),
        }
    }
}

#[async_trait]
impl Transport for PushTransport {
    fn name(&self) -> &'static str {
        "push"
    }

    #[instrument(skip(self, snapshot), fields(transport = "push", operation = "deliver"))]
    async fn deliver(&self, snapshot: &MetricsSnapshot) -> DeliveryResult {
        self.post(snapshot).await.into()
    }
}

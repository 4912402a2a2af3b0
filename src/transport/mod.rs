// Snapshot delivery: push to a backend over HTTP, or append into an in-process history store.

mod pull;
mod push;
mod retry;

pub use pull::PullTransport;
pub use push::PushTransport;
pub use retry::{RetryPolicy, Retrying};

use crate::error::DeliveryError;
use crate::models::MetricsSnapshot;
use async_trait::async_trait;

/// Outcome of one delivery attempt. Failures are reported, never raised.
#[derive(Debug, Clone)]
pub enum DeliveryResult {
    Delivered,
    Failed(DeliveryError),
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered)
    }
}

impl From<Result<(), DeliveryError>> for DeliveryResult {
    fn from(r: Result<(), DeliveryError>) -> Self {
        match r {
            Ok(()) => DeliveryResult::Delivered,
            Err(e) => DeliveryResult::Failed(e),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, snapshot: &MetricsSnapshot) -> DeliveryResult;
}

// Optional retry decorator. Only transient failures (unreachable, 5xx) are retried.

use super::{DeliveryResult, Transport};
use crate::models::MetricsSnapshot;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retry.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_millis(500),
        }
    }
}

pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for Retrying<T> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn deliver(&self, snapshot: &MetricsSnapshot) -> DeliveryResult {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self.inner.deliver(snapshot).await;
            match &result {
                DeliveryResult::Failed(e) if e.is_transient() && attempt < attempts => {
                    tracing::debug!(
                        error = %e,
                        attempt,
                        max_attempts = attempts,
                        "delivery failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.delay).await;
                }
                _ => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use axum::http::StatusCode;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays scripted outcomes, then succeeds.
    struct Scripted {
        outcomes: Mutex<Vec<DeliveryError>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<DeliveryError>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        async fn deliver(&self, _snapshot: &MetricsSnapshot) -> DeliveryResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcomes.lock().unwrap().pop() {
                Some(e) => DeliveryResult::Failed(e),
                None => DeliveryResult::Delivered,
            }
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_does_not_retry() {
        let t = Retrying::new(
            Scripted::new(vec![DeliveryError::Unreachable("refused".into())]),
            RetryPolicy::default(),
        );
        let r = t.deliver(&MetricsSnapshot::unknown(Utc::now())).await;
        assert!(!r.is_delivered());
        assert_eq!(t.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let t = Retrying::new(
            Scripted::new(vec![
                DeliveryError::Unreachable("refused".into()),
                DeliveryError::Status(StatusCode::BAD_GATEWAY),
            ]),
            policy(3),
        );
        let r = t.deliver(&MetricsSnapshot::unknown(Utc::now())).await;
        assert!(r.is_delivered());
        assert_eq!(t.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_rejection_is_not_retried() {
        let t = Retrying::new(
            Scripted::new(vec![DeliveryError::AuthRejected(StatusCode::UNAUTHORIZED)]),
            policy(3),
        );
        let r = t.deliver(&MetricsSnapshot::unknown(Utc::now())).await;
        assert!(matches!(
            r,
            DeliveryResult::Failed(DeliveryError::AuthRejected(_))
        ));
        assert_eq!(t.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let t = Retrying::new(
            Scripted::new(vec![
                DeliveryError::Status(StatusCode::SERVICE_UNAVAILABLE),
                DeliveryError::Status(StatusCode::SERVICE_UNAVAILABLE),
                DeliveryError::Status(StatusCode::SERVICE_UNAVAILABLE),
            ]),
            policy(2),
        );
        let r = t.deliver(&MetricsSnapshot::unknown(Utc::now())).await;
        assert!(!r.is_delivered());
        assert_eq!(t.inner().calls.load(Ordering::SeqCst), 2);
    }
}

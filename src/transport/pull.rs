// Pull mode: the freshest snapshots live in a shared store that HTTP readers query.

use super::{DeliveryResult, Transport};
use crate::history_store::HistoryStore;
use crate::models::MetricsSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

pub struct PullTransport {
    store: Arc<HistoryStore>,
}

impl PullTransport {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Transport for PullTransport {
    fn name(&self) -> &'static str {
        "pull"
    }

    async fn deliver(&self, snapshot: &MetricsSnapshot) -> DeliveryResult {
        let evicted = self.store.append(snapshot.clone()).await;
        if evicted > 0 {
            tracing::debug!(evicted, operation = "deliver", "history at capacity");
        }
        DeliveryResult::Delivered
    }
}

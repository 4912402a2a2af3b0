// In-memory ring of recent snapshots, ordered by timestamp. Single writer, many readers.

use crate::models::MetricsSnapshot;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of snapshots held; the oldest are evicted first.
    pub capacity: usize,
    /// Largest window a history query may ask for.
    pub max_window: Duration,
    /// Upper bound on points returned by one query.
    pub max_points: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 4320,
            max_window: Duration::from_secs(6 * 3600),
            max_points: 72,
        }
    }
}

pub struct HistoryStore {
    buf: RwLock<VecDeque<MetricsSnapshot>>,
    config: HistoryConfig,
}

impl HistoryStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            buf: RwLock::new(VecDeque::with_capacity(config.capacity.min(8192))),
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Inserts in timestamp order and evicts from the front when over capacity.
    /// Returns how many snapshots were evicted.
    pub async fn append(&self, snapshot: MetricsSnapshot) -> usize {
        let mut buf = self.buf.write().await;
        let in_order = buf.back().is_none_or(|last| last.timestamp <= snapshot.timestamp);
        if in_order {
            buf.push_back(snapshot);
        } else {
            // Late arrival: after any entries with an equal timestamp
            let pos = buf.partition_point(|s| s.timestamp <= snapshot.timestamp);
            buf.insert(pos, snapshot);
        }
        let mut evicted = 0;
        while buf.len() > self.config.capacity {
            buf.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::trace!(evicted, capacity = self.config.capacity, "history evicted oldest");
        }
        evicted
    }

    /// Snapshots with `since <= t <= until`, ascending. When more than `max_points` match
    /// (capped at the configured maximum), a fixed-stride subset is returned.
    #[instrument(skip(self), fields(store = "history", operation = "query"))]
    pub async fn query(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        max_points: usize,
    ) -> Vec<MetricsSnapshot> {
        if since > until {
            return Vec::new();
        }
        let max_points = max_points.min(self.config.max_points);
        let buf = self.buf.read().await;
        let start = buf.partition_point(|s| s.timestamp < since);
        let end = buf.partition_point(|s| s.timestamp <= until);
        let n = end.saturating_sub(start);
        if n <= max_points {
            return buf.range(start..end).cloned().collect();
        }
        (0..max_points)
            .map(|i| start + i * n / max_points)
            .filter_map(|idx| buf.get(idx).cloned())
            .collect()
    }

    /// Last `window` up to now, clamped to the configured maximum window.
    pub async fn recent(&self, window: Duration) -> Vec<MetricsSnapshot> {
        let window = window.min(self.config.max_window);
        let until = Utc::now();
        let since = chrono::Duration::from_std(window)
            .map(|w| until - w)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.query(since, until, self.config.max_points).await
    }

    pub async fn latest(&self) -> Option<MetricsSnapshot> {
        self.buf.read().await.back().cloned()
    }

    pub async fn len(&self) -> usize {
        self.buf.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buf.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> MetricsSnapshot {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let mut s = MetricsSnapshot::unknown(ts);
        s.cpu_percent = Some(secs as f64 % 100.0);
        s
    }

    fn store(capacity: usize, max_points: usize) -> HistoryStore {
        HistoryStore::new(HistoryConfig {
            capacity,
            max_window: Duration::from_secs(6 * 3600),
            max_points,
        })
    }

    fn secs(v: &[MetricsSnapshot]) -> Vec<i64> {
        v.iter().map(|s| s.timestamp.timestamp() - 1_700_000_000).collect()
    }

    #[tokio::test]
    async fn eviction_keeps_most_recent_capacity() {
        let s = store(3, 72);
        let mut evicted = 0;
        for i in 0..5 {
            evicted += s.append(at(i)).await;
        }
        assert_eq!(evicted, 2);
        assert_eq!(s.len().await, 3);
        let all = s.query(at(0).timestamp, at(10).timestamp, 72).await;
        assert_eq!(secs(&all), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn out_of_order_append_is_sorted() {
        let s = store(10, 72);
        for i in [0, 10, 20, 5, 10] {
            s.append(at(i)).await;
        }
        let all = s.query(at(0).timestamp, at(30).timestamp, 72).await;
        assert_eq!(secs(&all), vec![0, 5, 10, 10, 20]);
        assert_eq!(s.latest().await.map(|l| l.timestamp), Some(at(20).timestamp));
    }

    #[tokio::test]
    async fn query_window_is_inclusive() {
        let s = store(100, 72);
        for i in 0..10 {
            s.append(at(i * 60)).await;
        }
        let r = s.query(at(120).timestamp, at(300).timestamp, 72).await;
        assert_eq!(secs(&r), vec![120, 180, 240, 300]);
        assert!(s.query(at(300).timestamp, at(120).timestamp, 72).await.is_empty());
    }

    #[tokio::test]
    async fn query_downsamples_with_fixed_stride() {
        let s = store(1000, 72);
        for i in 0..100 {
            s.append(at(i)).await;
        }
        let r = s.query(at(0).timestamp, at(99).timestamp, 10).await;
        assert_eq!(secs(&r), vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let r = s.query(at(0).timestamp, at(99).timestamp, 1000).await;
        assert_eq!(r.len(), 72);
        assert!(r.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn empty_store() {
        let s = store(10, 72);
        assert!(s.is_empty().await);
        assert!(s.latest().await.is_none());
        assert!(s.recent(Duration::from_secs(3600)).await.is_empty());
        assert_eq!(s.capacity(), 10);
    }

    #[tokio::test]
    async fn recent_returns_points_inside_window() {
        let s = store(100, 72);
        let now = Utc::now();
        for m in [90, 50, 30, 1] {
            s.append(MetricsSnapshot::unknown(now - chrono::Duration::minutes(m)))
                .await;
        }
        assert_eq!(s.recent(Duration::from_secs(3600)).await.len(), 3);
        assert_eq!(s.recent(Duration::from_secs(2 * 3600)).await.len(), 4);
    }
}

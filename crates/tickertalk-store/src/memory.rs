use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tickertalk_models::HistoryEntry;

/// In-memory cache of reconstructed session histories, backed by moka.
///
/// Entries are evicted after TTL and must be invalidated whenever the
/// session is appended to.
pub struct HistoryCache {
    inner: Cache<String, Arc<Vec<HistoryEntry>>>,
}

impl HistoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Vec<HistoryEntry>>> {
        self.inner.get(session_id).await
    }

    pub async fn insert(&self, session_id: String, history: Arc<Vec<HistoryEntry>>) {
        self.inner.insert(session_id, history).await;
    }

    pub async fn invalidate(&self, session_id: &str) {
        self.inner.invalidate(session_id).await;
    }
}

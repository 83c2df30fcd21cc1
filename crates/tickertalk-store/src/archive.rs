use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tickertalk_models::{ChatSession, ConversationState, Exchange, HistoryEntry, SessionSummary};
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::memory::HistoryCache;
use crate::sqlite::SessionStore;

/// Process-wide handle on the session store.
///
/// Reads of a session's history go through the moka cache (hot) before
/// SQLite; every append invalidates the cached history of that session.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct ChatArchive {
    memory: HistoryCache,
    store: Mutex<SessionStore>,
    /// Bumped under the store lock by every append.
    generation: AtomicU64,
}

impl ChatArchive {
    pub fn new(store: SessionStore, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: HistoryCache::new(max_capacity, memory_ttl),
            store: Mutex::new(store),
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionStore>, StoreError> {
        self.store
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Append an exchange to a session (upsert on first write).
    pub async fn append(
        &self,
        session_id: &str,
        user_name: &str,
        prompt: &str,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<Exchange, StoreError> {
        let exchange = {
            let mut store = self.lock()?;
            let exchange = store.append_exchange(session_id, user_name, prompt, answer, now)?;
            self.generation.fetch_add(1, Ordering::SeqCst);
            exchange
        };
        self.memory.invalidate(session_id).await;
        Ok(exchange)
    }

    /// Best-effort append: a failure is logged and swallowed.
    ///
    /// Used after a chat answer has already been delivered, when there is
    /// nothing left to roll back.
    pub async fn record_exchange(
        &self,
        session_id: &str,
        user_name: &str,
        prompt: &str,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Option<Exchange> {
        match self.append(session_id, user_name, prompt, answer, now).await {
            Ok(exchange) => {
                info!(session_id, "Chat history saved");
                Some(exchange)
            }
            Err(e) => {
                error!(session_id, error = %e, "Error saving chat history");
                None
            }
        }
    }

    /// Chronological user/assistant history of a session.
    /// Checks moka first, then SQLite. Promotes SQLite reads to moka.
    pub async fn history(&self, session_id: &str) -> Result<Arc<Vec<HistoryEntry>>, StoreError> {
        if let Some(history) = self.memory.get(session_id).await {
            debug!(session_id, "History served from memory");
            return Ok(history);
        }

        let (generation, history) = self.load_history_snapshot(session_id)?;
        self.promote(session_id, Arc::clone(&history), generation)
            .await;
        Ok(history)
    }

    fn load_history_snapshot(
        &self,
        session_id: &str,
    ) -> Result<(u64, Arc<Vec<HistoryEntry>>), StoreError> {
        let store = self.lock()?;
        let history = store.load_history(session_id)?;
        Ok((self.generation.load(Ordering::SeqCst), Arc::new(history)))
    }

    /// Cache a history read at `generation`, unless an append has landed since.
    async fn promote(&self, session_id: &str, history: Arc<Vec<HistoryEntry>>, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.memory.insert(session_id.to_string(), history).await;
        // An append may have slipped in between the check and the insert.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.memory.invalidate(session_id).await;
        }
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        self.lock()?.list_sessions()
    }

    pub fn load_session(&self, session_id: &str) -> Result<Option<ChatSession>, StoreError> {
        self.lock()?.load_session(session_id)
    }

    pub fn load_checkpoint(
        &self,
        session_id: &str,
        namespace: &str,
    ) -> Result<Option<ConversationState>, StoreError> {
        self.lock()?.load_checkpoint(session_id, namespace)
    }

    pub fn save_checkpoint(
        &self,
        session_id: &str,
        namespace: &str,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        self.lock()?.save_checkpoint(session_id, namespace, state)
    }

    /// Close the underlying connection.
    pub fn close(self) -> Result<(), StoreError> {
        let store = self
            .store
            .into_inner()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        store.close()
    }
}

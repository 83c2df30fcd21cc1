use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tickertalk_models::session_schema::SESSION_TABLES_DDL;
use tickertalk_models::{
    date_bucket, format_timestamp, ChatSession, ConversationState, Exchange, HistoryEntry,
    SessionSummary,
};

use crate::error::StoreError;

/// SQLite-backed session store.
///
/// Opens the database read-write in WAL mode so several processes (or
/// connections) can append to the same file; writers take the database lock
/// up front (`BEGIN IMMEDIATE`) and wait on the busy timeout instead of
/// failing.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open (or create) the session database at `path`.
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SESSION_TABLES_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SESSION_TABLES_DDL)?;
        Ok(Self { conn })
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    /// Append one prompt/answer exchange to a session, creating the session on
    /// first write.
    ///
    /// `user_name` and `created_at` are only written when the session does not
    /// exist yet. Both exchange timestamps are `now`; the exchange is filed
    /// under the calendar date of `now`.
    pub fn append_exchange(
        &mut self,
        session_id: &str,
        user_name: &str,
        prompt: &str,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<Exchange, StoreError> {
        let timestamp = format_timestamp(now);
        let chat_date = date_bucket(now);
        let exchange = Exchange {
            prompt: prompt.to_string(),
            prompt_timestamp: timestamp.clone(),
            answer: answer.to_string(),
            answer_timestamp: timestamp.clone(),
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_exchange(&tx, session_id, user_name, &timestamp, &chat_date, &exchange)?;
        tx.commit()?;

        Ok(exchange)
    }

    /// List sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT session_id, created_at FROM chat_sessions \
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Load the full session document. Returns None if the session was never written.
    pub fn load_session(&self, session_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let mut header = self.conn.prepare_cached(
            "SELECT session_id, user_name, created_at FROM chat_sessions WHERE session_id = ?1",
        )?;

        let result = header.query_row(rusqlite::params![session_id], |row| {
            Ok(ChatSession {
                session_id: row.get(0)?,
                user_name: row.get(1)?,
                created_at: row.get(2)?,
                messages: BTreeMap::new(),
            })
        });

        let mut session = match result {
            Ok(session) => session,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Sqlite(e)),
        };

        let mut stmt = self.conn.prepare_cached(
            "SELECT chat_date, prompt, prompt_timestamp, answer, answer_timestamp \
             FROM chat_exchanges WHERE session_id = ?1 ORDER BY chat_date, seq",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![session_id], |row| {
                let chat_date: String = row.get(0)?;
                Ok((
                    chat_date,
                    Exchange {
                        prompt: row.get(1)?,
                        prompt_timestamp: row.get(2)?,
                        answer: row.get(3)?,
                        answer_timestamp: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (chat_date, exchange) in rows {
            session.messages.entry(chat_date).or_default().push(exchange);
        }

        Ok(Some(session))
    }

    /// Load a session's history as user/assistant pairs in chronological order.
    /// Unknown sessions yield an empty history.
    pub fn load_history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self
            .load_session(session_id)?
            .map(|session| session.history())
            .unwrap_or_default())
    }

    /// Load the checkpointed conversation of a session, if any.
    pub fn load_checkpoint(
        &self,
        session_id: &str,
        namespace: &str,
    ) -> Result<Option<ConversationState>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT state_json FROM checkpoints WHERE session_id = ?1 AND namespace = ?2",
        )?;

        let result = stmt.query_row(rusqlite::params![session_id, namespace], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Replace the checkpointed conversation of a session.
    pub fn save_checkpoint(
        &self,
        session_id: &str,
        namespace: &str,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        let state_json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO checkpoints (session_id, namespace, state_json, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(session_id, namespace) DO UPDATE SET \
             state_json = excluded.state_json, updated_at = excluded.updated_at",
            rusqlite::params![
                session_id,
                namespace,
                state_json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Count all session documents.
    pub fn count_sessions(&self) -> Result<usize, StoreError> {
        let count: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> &Connection {
        &self.conn
    }
}

fn insert_exchange(
    tx: &Transaction<'_>,
    session_id: &str,
    user_name: &str,
    created_at: &str,
    chat_date: &str,
    exchange: &Exchange,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO chat_sessions (session_id, user_name, created_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(session_id) DO NOTHING",
        rusqlite::params![session_id, user_name, created_at],
    )?;
    tx.execute(
        "INSERT INTO chat_exchanges \
         (session_id, chat_date, prompt, prompt_timestamp, answer, answer_timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            session_id,
            chat_date,
            exchange.prompt,
            exchange.prompt_timestamp,
            exchange.answer,
            exchange.answer_timestamp,
        ],
    )?;
    Ok(())
}

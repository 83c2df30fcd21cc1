/// SQLite schema of the session store.
///
/// A session document is split across two tables: `chat_sessions` holds the
/// insert-only header fields and `chat_exchanges` holds the append-only
/// exchanges, each tagged with its date bucket. `checkpoints` holds the
/// supervisor's conversation state per session and namespace.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS chat_sessions (
///     session_id  TEXT PRIMARY KEY,
///     user_name   TEXT NOT NULL,
///     created_at  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS chat_exchanges (
///     seq               INTEGER PRIMARY KEY AUTOINCREMENT,
///     session_id        TEXT NOT NULL REFERENCES chat_sessions(session_id),
///     chat_date         TEXT NOT NULL,
///     prompt            TEXT NOT NULL,
///     prompt_timestamp  TEXT NOT NULL,
///     answer            TEXT NOT NULL,
///     answer_timestamp  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS checkpoints (
///     session_id  TEXT NOT NULL,
///     namespace   TEXT NOT NULL,
///     state_json  TEXT NOT NULL,
///     updated_at  TEXT NOT NULL,
///     PRIMARY KEY (session_id, namespace)
/// );
/// ```
pub const SESSION_TABLES_DDL: &str = "\
CREATE TABLE IF NOT EXISTS chat_sessions (
    session_id  TEXT PRIMARY KEY,
    user_name   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chat_exchanges (
    seq               INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id        TEXT NOT NULL REFERENCES chat_sessions(session_id),
    chat_date         TEXT NOT NULL,
    prompt            TEXT NOT NULL,
    prompt_timestamp  TEXT NOT NULL,
    answer            TEXT NOT NULL,
    answer_timestamp  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS checkpoints (
    session_id  TEXT NOT NULL,
    namespace   TEXT NOT NULL,
    state_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (session_id, namespace)
);
CREATE INDEX IF NOT EXISTS idx_sessions_created ON chat_sessions(created_at);
CREATE INDEX IF NOT EXISTS idx_exchanges_session ON chat_exchanges(session_id, chat_date);
";

/// Default checkpoint namespace for the supervisor conversation.
pub const DEFAULT_CHECKPOINT_NAMESPACE: &str = "chat";

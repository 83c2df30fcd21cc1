use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Role;

/// UTC timestamp format used for `created_at` and exchange timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Calendar-date format of the per-day exchange buckets.
pub const DATE_BUCKET_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Date bucket an exchange completed at `at` is filed under (local calendar date).
pub fn date_bucket(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(DATE_BUCKET_FORMAT).to_string()
}

/// One persisted prompt/answer pair. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub prompt: String,
    pub prompt_timestamp: String,
    pub answer: String,
    pub answer_timestamp: String,
}

/// The persisted document of one chat session.
///
/// ```json
/// {
///   "session_id": "...",
///   "user_name": "Alice",
///   "created_at": "2026-10-18T09:30:00",
///   "messages": {
///     "2026-10-18": [
///       {"prompt": "...", "prompt_timestamp": "...", "answer": "...", "answer_timestamp": "..."}
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSession {
    pub session_id: String,
    pub user_name: String,
    pub created_at: String,
    /// Date bucket (`YYYY-MM-DD`) to exchanges in insertion order.
    #[serde(default)]
    pub messages: BTreeMap<String, Vec<Exchange>>,
}

impl ChatSession {
    pub fn exchange_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    /// Flatten the buckets in ascending date order into user/assistant pairs.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let mut entries = Vec::with_capacity(self.exchange_count() * 2);
        for exchanges in self.messages.values() {
            for exchange in exchanges {
                entries.push(HistoryEntry {
                    role: Role::User,
                    content: exchange.prompt.clone(),
                });
                entries.push(HistoryEntry {
                    role: Role::Assistant,
                    content: exchange.answer.clone(),
                });
            }
        }
        entries
    }
}

/// A row of the session listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: String,
}

/// A display message reconstructed from persisted exchanges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn exchange(prompt: &str, answer: &str) -> Exchange {
        Exchange {
            prompt: prompt.to_string(),
            prompt_timestamp: "2026-10-17T10:00:00".to_string(),
            answer: answer.to_string(),
            answer_timestamp: "2026-10-17T10:00:05".to_string(),
        }
    }

    #[test]
    fn timestamp_has_no_offset_or_fraction() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 7, 5, 9).unwrap();
        assert_eq!(format_timestamp(at), "2026-10-18T07:05:09");
    }

    #[test]
    fn history_walks_buckets_in_date_order() {
        let mut messages = BTreeMap::new();
        messages.insert("2026-10-18".to_string(), vec![exchange("later", "b")]);
        messages.insert(
            "2026-10-17".to_string(),
            vec![exchange("first", "a1"), exchange("second", "a2")],
        );
        let session = ChatSession {
            session_id: "s1".to_string(),
            user_name: "Alice".to_string(),
            created_at: "2026-10-17T10:00:00".to_string(),
            messages,
        };

        let history = session.history();
        let contents: Vec<&str> = history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "a1", "second", "a2", "later", "b"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(session.exchange_count(), 3);
    }

    #[test]
    fn document_json_shape() {
        let mut messages = BTreeMap::new();
        messages.insert("2026-10-17".to_string(), vec![exchange("p", "a")]);
        let session = ChatSession {
            session_id: "s1".to_string(),
            user_name: "Alice".to_string(),
            created_at: "2026-10-17T10:00:00".to_string(),
            messages,
        };

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["messages"]["2026-10-17"][0]["prompt"], "p");
        assert_eq!(json["messages"]["2026-10-17"][0]["answer_timestamp"], "2026-10-17T10:00:05");
    }
}

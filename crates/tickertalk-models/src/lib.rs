pub mod config;
pub mod envelope;
pub mod message;
pub mod session;
pub mod session_schema;

pub use config::{AgentsConfig, GatewayConfig, StoreConfig, TickertalkConfig};
pub use envelope::{Envelope, ErrorKind};
pub use message::{ConversationState, Message, MessageId, MessageOp, Role};
pub use session::{
    date_bucket, format_timestamp, ChatSession, Exchange, HistoryEntry, SessionSummary,
    DATE_BUCKET_FORMAT, TIMESTAMP_FORMAT,
};

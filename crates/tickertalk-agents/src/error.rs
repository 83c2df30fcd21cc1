use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Model stream error: {0}")]
    Stream(String),

    #[error("Store error: {0}")]
    Store(#[from] tickertalk_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

use thiserror::Error;
use tickertalk_models::ErrorKind;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Value(String),

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn value(message: impl Into<String>) -> Self {
        ToolError::Value(message.into())
    }

    /// Envelope category this fault is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Transport(_) | ToolError::Api { .. } | ToolError::Malformed(_) => {
                ErrorKind::ApiError
            }
            ToolError::Value(_) => ErrorKind::ValueError,
            ToolError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

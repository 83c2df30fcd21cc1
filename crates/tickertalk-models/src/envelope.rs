use std::fmt;

use serde::{Deserialize, Serialize};

/// Fault category carried by an error envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The remote call failed in transport, returned non-2xx, or returned a malformed body.
    ApiError,
    /// Missing credential or invalid input.
    ValueError,
    /// Anything else. Carries a trace.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::ValueError => "VALUE_ERROR",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(s)
    }
}

/// Uniform result of every externally-fallible tool call.
///
/// Serialized as `{"status": "success", "data": ...}` or
/// `{"status": "error", "type": "API_ERROR", "message": "...", "trace": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        data: serde_json::Value,
    },
    Error {
        #[serde(rename = "type")]
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
    },
}

impl Envelope {
    pub fn success(data: serde_json::Value) -> Self {
        Envelope::Success { data }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Envelope::Error {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Error { kind, .. } => Some(*kind),
        }
    }

    /// Compact JSON text, as handed back to the calling agent.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","type":"INTERNAL_ERROR","message":"unserializable envelope: {e}"}}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape() {
        let env = Envelope::success(serde_json::json!({"gainers": []}));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "data": {"gainers": []}}));
    }

    #[test]
    fn error_shape_omits_missing_trace() {
        let env = Envelope::error(ErrorKind::ApiError, "API returned 404: not found");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "error",
                "type": "API_ERROR",
                "message": "API returned 404: not found"
            })
        );
    }

    #[test]
    fn internal_error_keeps_trace() {
        let env = Envelope::Error {
            kind: ErrorKind::InternalError,
            message: "boom".to_string(),
            trace: Some("at frame 0".to_string()),
        };
        let text = env.to_json_string();
        let parsed: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, env);
        assert!(text.contains("\"trace\""));
    }

    #[test]
    fn error_kind_accessor() {
        assert_eq!(Envelope::success(serde_json::json!(1)).error_kind(), None);
        assert_eq!(
            Envelope::error(ErrorKind::ValueError, "x").error_kind(),
            Some(ErrorKind::ValueError)
        );
        assert_eq!(ErrorKind::InternalError.to_string(), "INTERNAL_ERROR");
    }
}

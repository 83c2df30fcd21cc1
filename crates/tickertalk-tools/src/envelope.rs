//! Fault normalization for every externally-fallible tool call.
//!
//! A tool body returns `Result<T, ToolError>`; the wrappers here turn that,
//! or a panic inside it, into an [`Envelope`]. Nothing escapes: callers
//! always get data back.

use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use serde::Serialize;
use tickertalk_models::{Envelope, ErrorKind};
use tracing::{error, warn};

use crate::error::ToolError;

/// Convert a tool result into an envelope.
pub fn into_envelope<T: Serialize>(result: Result<T, ToolError>) -> Envelope {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(data) => Envelope::success(data),
            Err(e) => internal(format!("Failed to serialize tool result: {e}")),
        },
        Err(ToolError::Internal(message)) => internal(message),
        Err(e) => {
            warn!(kind = %e.kind(), error = %e, "Tool call failed");
            Envelope::error(e.kind(), e.to_string())
        }
    }
}

/// Run an async tool body, catching both errors and panics.
pub async fn guard<F, T>(body: F) -> Envelope
where
    F: Future<Output = Result<T, ToolError>>,
    T: Serialize,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(result) => into_envelope(result),
        Err(payload) => internal(panic_message(payload)),
    }
}

/// Run a synchronous tool body, catching both errors and panics.
pub fn guard_sync<F, T>(body: F) -> Envelope
where
    F: FnOnce() -> Result<T, ToolError>,
    T: Serialize,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => into_envelope(result),
        Err(payload) => internal(panic_message(payload)),
    }
}

fn internal(message: String) -> Envelope {
    let trace = Backtrace::force_capture().to_string();
    error!(error = %message, "Internal tool fault");
    Envelope::Error {
        kind: ErrorKind::InternalError,
        message,
        trace: Some(trace),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_becomes_success() {
        let env = guard_sync(|| Ok::<_, ToolError>(serde_json::json!({"price": 10})));
        assert_eq!(env, Envelope::success(serde_json::json!({"price": 10})));
    }

    #[test]
    fn value_fault_becomes_value_error() {
        let env = guard_sync(|| Err::<(), _>(ToolError::value("missing close")));
        assert_eq!(env, Envelope::error(ErrorKind::ValueError, "missing close"));
    }

    #[test]
    fn internal_fault_carries_trace() {
        let env = guard_sync(|| Err::<(), _>(ToolError::Internal("bad state".into())));
        match env {
            Envelope::Error {
                kind,
                message,
                trace,
            } => {
                assert_eq!(kind, ErrorKind::InternalError);
                assert_eq!(message, "bad state");
                assert!(trace.is_some());
            }
            other => panic!("expected error envelope, got {other:?}"),
        }
    }

    #[test]
    fn panic_is_contained() {
        let env = guard_sync(|| -> Result<(), ToolError> { panic!("index out of range") });
        assert_eq!(env.error_kind(), Some(ErrorKind::InternalError));
        match env {
            Envelope::Error { message, .. } => assert_eq!(message, "index out of range"),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn async_panic_is_contained() {
        let env = guard(async {
            let rows: Vec<u32> = Vec::new();
            Ok::<_, ToolError>(rows[3])
        })
        .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::InternalError));
    }

    #[tokio::test]
    async fn async_api_fault() {
        let env = guard(async {
            Err::<(), _>(ToolError::Api {
                status: 503,
                body: "down".into(),
            })
        })
        .await;
        assert_eq!(
            env,
            Envelope::error(ErrorKind::ApiError, "API returned 503: down")
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::models::Warning;

/// Structured result of one command.
///
/// Recoverable per-row issues ride in `warnings` with `ok=true`; a fatal
/// error sets `ok=false`, carries a single error kind and guarantees no
/// partial state was persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome<T> {
    pub ok: bool,
    pub warnings: Vec<Warning>,
    pub value: Option<T>,
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl<T> CommandOutcome<T> {
    pub fn success(value: T, warnings: Vec<Warning>) -> Self {
        Self {
            ok: true,
            warnings,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(err: Error) -> Self {
        Self {
            ok: false,
            warnings: Vec::new(),
            value: None,
            error: Some(ErrorResponse {
                kind: err.kind().to_string(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            }),
        }
    }

    pub fn from_result(result: crate::errors::Result<(T, Vec<Warning>)>) -> Self {
        match result {
            Ok((value, warnings)) => Self::success(value, warnings),
            Err(err) => Self::failure(err),
        }
    }
}

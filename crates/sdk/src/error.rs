use std::error::Error as _;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by every SDK operation.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Caller supplied something the SDK cannot act on (bad name, missing application).
    #[error("invalid input: {0}")]
    Input(String),
    /// Login or refresh was rejected, the endpoint is unusable, or a request came back 401.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Controller answered with a non-success status.
    #[error("controller error (status {status}): {message}")]
    Api { status: StatusCode, message: String },
    /// Response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// A manifest could not be encoded as YAML.
    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),
    /// The retry deadline elapsed before any attempt finished.
    #[error("retry deadline of {0:?} elapsed before the request completed")]
    Timeout(Duration),
}

impl SdkError {
    /// Only errors that can change between attempts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SdkError::Api { .. } | SdkError::Transport(_) | SdkError::Auth(_)
        )
    }

    /// HTTP status when the controller produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SdkError::Decode(error_chain(&err));
        }
        SdkError::Transport(error_chain(&err))
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Decode(err.to_string())
    }
}

/// reqwest hides the interesting part (`connection reset`, `EOF`) in the
/// source chain, and retry rules match against the rendered message.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

pub(crate) fn render_controller_error(status: StatusCode, body: &str) -> String {
    match extract_error_message(body) {
        Some(message) => message,
        None => format!("request failed with status {status}"),
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(val) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = val.get(key).and_then(|m| m.as_str()) {
                return Some(message.to_string());
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors from the Memos REST client.
#[derive(Debug, Error)]
pub enum MemosError {
    #[error("memos HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("memos service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode memos response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("memos response did not include a resource name")]
    MissingName,
}

impl MemosError {
    pub fn status(status: StatusCode, body: String) -> Self {
        MemosError::Status { status, body }
    }

    /// `true` when the service rejected the request as malformed (HTTP 400).
    pub fn is_bad_request(&self) -> bool {
        matches!(self, MemosError::Status { status, .. } if *status == StatusCode::BAD_REQUEST)
    }
}

/// A creation timestamp that could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("invalid timestamp `{raw}`: {reason}")]
    Invalid { raw: String, reason: String },
    #[error("epoch timestamp {0} is out of range")]
    OutOfRange(i64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised before or while executing an action plan.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("confirmation declined, nothing was changed")]
    ConfirmationDeclined,
    #[error("console i/o failed: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Errors from the external post source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read feed {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode feed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors while downloading images or videos for attachments.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media host returned status {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("video tool `{tool}` failed: {stderr}")]
    Tool { tool: String, stderr: String },
    #[error("video download timed out after {0:?}")]
    Timeout(Duration),
    #[error("video tool did not produce {0}")]
    MissingOutput(String),
    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),
}

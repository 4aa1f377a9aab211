use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable failure taxonomy surfaced to callers.
///
/// Retryability is fixed per kind so callers can implement backoff
/// without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    Throttled,
    Timeout,
    InternalError,
}

impl ErrorKind {
    pub fn retryable(self) -> bool {
        match self {
            ErrorKind::UnknownTool | ErrorKind::InvalidArguments => false,
            ErrorKind::Throttled | ErrorKind::Timeout | ErrorKind::InternalError => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::Throttled => "throttled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

/// A structured failure reported for one invocation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{}: {message}", .kind.as_str())]
pub struct InvokeFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl InvokeFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.retryable(),
        }
    }
}

/// Errors a tool handler itself may return; the pool maps these to
/// `InternalError` failures.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Registration-time errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
}

/// First violated constraint found by the schema validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    /// One of: required, type, length, range, pattern, enum, unknown_field.
    pub constraint: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        constraint: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            constraint,
            message: message.into(),
        }
    }
}

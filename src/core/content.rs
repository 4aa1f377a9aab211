//! Structured content model for invocation results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{ErrorKind, InvokeFailure};

/// One typed item in a successful result, tagged like an MCP content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    Json { value: JsonValue },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn json(value: impl Into<JsonValue>) -> Self {
        ContentItem::Json { value: value.into() }
    }
}

/// Caller-visible outcome of one invocation. The core never retains it
/// after the call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { content: Vec<ContentItem> },
    Failure(InvokeFailure),
}

impl InvocationOutcome {
    pub fn success(content: Vec<ContentItem>) -> Self {
        InvocationOutcome::Success { content }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        InvocationOutcome::Failure(InvokeFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            InvocationOutcome::Success { .. } => None,
            InvocationOutcome::Failure(f) => Some(f.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_tags_content_items() {
        let s = serde_json::to_value(ContentItem::text("hi")).unwrap();
        assert_eq!(s["type"], "text");
        assert_eq!(s["text"], "hi");
    }

    #[test]
    fn it_serializes_outcome_with_status_tag() {
        let ok = InvocationOutcome::success(vec![ContentItem::text("done")]);
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], "success");

        let bad = InvocationOutcome::failure(ErrorKind::Throttled, "try later");
        let v = serde_json::to_value(&bad).unwrap();
        assert_eq!(v["status"], "failure");
        assert_eq!(v["kind"], "throttled");
        assert_eq!(v["retryable"], true);
    }

    #[test]
    fn error_kind_reports_failures_only() {
        let ok = InvocationOutcome::success(vec![]);
        assert!(ok.is_success());
        assert_eq!(ok.error_kind(), None);
        let bad = InvocationOutcome::failure(ErrorKind::Timeout, "too slow");
        assert_eq!(bad.error_kind(), Some(ErrorKind::Timeout));
    }
}

//! Audit sink collaborator: one structured event per completed
//! invocation. Persistence and export are the embedder's concern.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::ErrorKind;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub tool_name: String,
    pub caller_id: String,
    pub duration_ms: u64,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub at: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Default sink: emits one structured tracing line per invocation.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            tool = %event.tool_name,
            caller = %event.caller_id,
            duration_ms = event.duration_ms,
            outcome = event.outcome,
            error_kind = event.error_kind.map(ErrorKind::as_str),
            "tool invocation"
        );
    }
}

/// Discards every event; for embedders that audit elsewhere.
#[derive(Debug, Clone, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_without_null_error_kind() {
        let e = AuditEvent {
            tool_name: "echo".into(),
            caller_id: "alice".into(),
            duration_ms: 3,
            outcome: "success",
            error_kind: None,
            at: Utc::now(),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["outcome"], "success");
        assert!(v.get("error_kind").is_none());
        NullAuditSink.record(&e);
        TracingAuditSink.record(&e);
    }
}

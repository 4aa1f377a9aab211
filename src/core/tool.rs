use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::content::ContentItem;
use super::error::ToolError;
use super::schema::ParameterSchema;

/// Ordered argument map; `serde_json` is built with `preserve_order` so
/// insertion order survives round trips.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Declared metadata for one tool. Immutable once registered; removed
/// only by explicit deregistration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContract {
    pub name: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
    #[serde(default)]
    pub declares_side_effects: bool,
}

impl ToolContract {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema,
            declares_side_effects: false,
        }
    }

    pub fn with_side_effects(mut self) -> Self {
        self.declares_side_effects = true;
        self
    }
}

/// Per-call execution context handed to a handler: the cancellation
/// signal and the deadline. Cancellation is cooperative; a handler that
/// never checks the token can outlive its reported timeout.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl CallContext {
    pub fn new(cancel: CancellationToken, deadline: Instant) -> Self {
        Self { cancel, deadline }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when cancellation is requested; intended for `select!`
    /// inside long-running handlers.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Executable side of a tool. Registered alongside a [`ToolContract`];
/// the registry entry owns it exclusively.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &JsonMap, ctx: &CallContext)
        -> Result<Vec<ContentItem>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Upper;

    #[async_trait]
    impl ToolHandler for Upper {
        async fn call(
            &self,
            arguments: &JsonMap,
            _ctx: &CallContext,
        ) -> Result<Vec<ContentItem>, ToolError> {
            let s = arguments
                .get("s")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(vec![ContentItem::text(s.to_uppercase())])
        }
    }

    #[tokio::test]
    async fn handler_runs_with_context() {
        let ctx = CallContext::new(
            CancellationToken::new(),
            Instant::now() + Duration::from_secs(1),
        );
        let mut args = JsonMap::new();
        args.insert("s".into(), serde_json::json!("hi"));
        let out = Upper.call(&args, &ctx).await.unwrap();
        assert_eq!(out, vec![ContentItem::text("HI")]);
        assert!(!ctx.is_cancelled());
        assert!(ctx.remaining() <= Duration::from_secs(1));
    }

    #[test]
    fn contract_defaults_to_no_side_effects() {
        let c = ToolContract::new("t", "a tool", ParameterSchema::object());
        assert!(!c.declares_side_effects);
        assert!(c.with_side_effects().declares_side_effects);
    }
}

use async_trait::async_trait;

use crate::core::content::ContentItem;
use crate::core::error::ToolError;
use crate::core::schema::{FieldSpec, ParameterSchema};
use crate::core::tool::{CallContext, JsonMap, ToolContract, ToolHandler};

/// Reference tool: echoes the `text` argument back as text content.
#[derive(Clone, Default)]
pub struct EchoTool;

impl EchoTool {
    pub fn contract() -> ToolContract {
        ToolContract::new(
            "echo",
            "Echo the given text back to the caller",
            ParameterSchema::object().field(FieldSpec::string("text").required()),
        )
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(
        &self,
        arguments: &JsonMap,
        _ctx: &CallContext,
    ) -> Result<Vec<ContentItem>, ToolError> {
        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(vec![ContentItem::text(text)])
    }
}

use super::script::ReplayScript;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use triad_application::{ToolError, ToolExecutorPort};

/// Tool executor answering every call to a function with a fixed result
pub struct ReplayToolExecutor {
    tool_id: String,
    functions: HashMap<String, Value>,
}

impl ReplayToolExecutor {
    pub fn new(tool_id: impl Into<String>, functions: HashMap<String, Value>) -> Self {
        Self {
            tool_id: tool_id.into(),
            functions,
        }
    }

    /// One executor per tool in `script`
    pub fn from_script(script: &ReplayScript) -> Vec<Arc<dyn ToolExecutorPort>> {
        script
            .tools
            .iter()
            .map(|(id, functions)| {
                Arc::new(Self::new(id.clone(), functions.clone())) as Arc<dyn ToolExecutorPort>
            })
            .collect()
    }
}

#[async_trait]
impl ToolExecutorPort for ReplayToolExecutor {
    fn tool_id(&self) -> &str {
        &self.tool_id
    }

    async fn execute(&self, function: &str, params: &Value) -> Result<Value, ToolError> {
        debug!(tool = %self.tool_id, function, %params, "Replaying tool call");
        self.functions
            .get(function)
            .cloned()
            .ok_or_else(|| ToolError::UnknownFunction {
                tool: self.tool_id.clone(),
                function: function.to_string(),
            })
    }
}

//! Tool Executor port
//!
//! Defines the interface for invoking a connector (Sheets, Drive, Plaid, ...)
//! as an opaque tool: a function name plus JSON parameters in, JSON out.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Unknown function {function} on tool {tool}")]
    UnknownFunction { tool: String, function: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// Port for tool execution
///
/// One executor is registered per tool id. Implementations (adapters) live
/// in the infrastructure layer.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Id this executor is registered under
    fn tool_id(&self) -> &str;

    /// Execute `function` with `params`, returning the raw tool output
    async fn execute(
        &self,
        function: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

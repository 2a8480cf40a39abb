//! Application layer for triad
//!
//! This crate contains the orchestration use case, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestrationParams;
pub use ports::{
    agent_registry::{AgentRegistry, RegistryError},
    chain_executor::{ChainError, ChainExecutor},
    status_sink::{NoStatus, StatusSink},
    tool_executor::{ToolError, ToolExecutorPort},
};
pub use use_cases::error_handler::{ErrorDecision, ErrorHandler};
pub use use_cases::orchestrate::{
    ErrorScope, OrchestrationError, OrchestrationManager, PlanOutcome, TaskOutcome, TaskRequest,
};
pub use use_cases::state_manager::{PlanExecutionStateManager, TaskSlot};

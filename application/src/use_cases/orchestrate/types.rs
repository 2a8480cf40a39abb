//! Type definitions for the orchestration use cases.

use crate::ports::agent_registry::RegistryError;
use crate::ports::chain_executor::ChainError;
use crate::ports::tool_executor::ToolError;
use thiserror::Error;
use triad_domain::{
    ChainExecutionResult, ChainType, DomainError, ErrorClass, InteractionType, Judgement,
    Participant, PlanId, TaskId,
};

/// Errors that can occur during orchestration
#[derive(Error, Debug, Clone)]
pub enum OrchestrationError {
    #[error("Task {task} cannot run: dependencies unmet or attempts exhausted")]
    Dependency { task: TaskId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrency limit: {0}")]
    Concurrency(String),

    #[error("Plan nesting too deep (depth {depth}, max {max})")]
    PlanDepthExceeded { depth: usize, max: usize },

    #[error("No execution context for plan {0}")]
    PlanNotFound(PlanId),

    #[error("Chain {chain_id} failed: {message}")]
    ChainFailed { chain_id: String, message: String },

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for OrchestrationError {
    fn from(e: serde_json::Error) -> Self {
        OrchestrationError::Serialization(e.to_string())
    }
}

impl OrchestrationError {
    /// Coarse class consulted first by the error handler.
    pub fn class(&self) -> ErrorClass {
        match self {
            OrchestrationError::Dependency { .. } => ErrorClass::Dependency,
            OrchestrationError::Domain(DomainError::TaskNotReady(_)) => ErrorClass::Dependency,
            OrchestrationError::Validation(_) => ErrorClass::Validation,
            OrchestrationError::PlanDepthExceeded { .. } => ErrorClass::Validation,
            OrchestrationError::Domain(e) if e.is_shape_error() => ErrorClass::Validation,
            OrchestrationError::Chain(ChainError::InvalidOutput(_)) => ErrorClass::Validation,
            OrchestrationError::Registry(RegistryError::ToolNotFound(_)) => ErrorClass::Validation,
            OrchestrationError::Tool(ToolError::InvalidArguments(_)) => ErrorClass::Validation,
            OrchestrationError::Tool(ToolError::UnknownFunction { .. }) => ErrorClass::Validation,
            OrchestrationError::Concurrency(_) => ErrorClass::Concurrency,
            _ => ErrorClass::Unclassified,
        }
    }

    /// Misconfigured chains or agents; retrying cannot help.
    pub fn is_configuration(&self) -> bool {
        match self {
            OrchestrationError::Chain(e) => e.is_configuration(),
            OrchestrationError::Registry(RegistryError::AgentNotFound(_))
            | OrchestrationError::Registry(RegistryError::SpecialistUnavailable(_)) => true,
            _ => false,
        }
    }

    /// Errors that a fresh attempt of the same task would run into again:
    /// the task cannot run at all, or its planner nests past the depth limit.
    pub fn ends_task(&self) -> bool {
        self.class() == ErrorClass::Dependency
            || matches!(self, OrchestrationError::PlanDepthExceeded { .. })
    }
}

/// Where an error surfaced, for error-code mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorScope {
    pub interaction_type: Option<InteractionType>,
    pub chain_type: Option<ChainType>,
}

impl ErrorScope {
    pub fn new(interaction_type: Option<InteractionType>, chain_type: Option<ChainType>) -> Self {
        Self {
            interaction_type,
            chain_type,
        }
    }

    pub fn interaction(interaction_type: InteractionType) -> Self {
        Self::new(Some(interaction_type), None)
    }

    pub fn task() -> Self {
        Self::new(Some(InteractionType::Task), Some(ChainType::TaskExecution))
    }

    pub fn with_chain(mut self, chain_type: ChainType) -> Self {
        self.chain_type = Some(chain_type);
        self
    }
}

/// Request to run one attempt of a task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub plan_id: PlanId,
    pub task_id: TaskId,
    /// Composed task input (JSON text)
    pub input: String,
    /// Points the previous verdict reported as missing
    pub missing: Vec<String>,
    /// Who handed the task out (the plan's initiating agent)
    pub assigned_by: Participant,
}

/// Result of one task attempt that ran to completion.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    /// Executor chain envelope
    pub chain: ChainExecutionResult,
    /// Summarized answer
    pub output: String,
    pub judgement: Judgement,
}

/// Result of a plan execution.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan_id: PlanId,
    pub summary: String,
    /// Whether every task reached SUCCESS
    pub succeeded: bool,
    pub completed: usize,
    pub total: usize,
}

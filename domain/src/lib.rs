//! Domain layer for triad
//!
//! This crate contains the entities, value objects and pure scheduling logic
//! of the orchestration engine. It has no I/O and no async code.
//!
//! # Core Concepts
//!
//! - **Thread**: a work session owning an append-only list of interactions
//! - **Interaction**: one typed step (message, task, plan, tool call, judgement)
//! - **Plan / Task**: a goal and its ordered, dependency-annotated task list
//! - **ChainResult**: the tagged union every chain output is classified into
//! - **PlanExecutionContext**: per-plan task states and executor/validator/summarizer squads

pub mod agent;
pub mod chain;
pub mod core;
pub mod execution;
pub mod interaction;
pub mod plan;
pub mod thread;

// Re-export commonly used types
pub use agent::{Agent, AgentId, AgentRole};
pub use chain::{ChainExecutionResult, ChainInput, ChainResult, ChainType};
pub use core::{
    error::DomainError,
    error_code::{ErrorClass, ErrorCode, Severity},
};
pub use execution::{
    PlanExecutionContext, PlanReport, PreviousTask, RoleBinding, SquadUpdate, TaskExecutionSquad,
    TaskReport, TaskState,
};
pub use interaction::{
    Interaction, InteractionError, InteractionId, InteractionPayload, InteractionStatus,
    InteractionType, Judgement, JudgementAnalysis, Message, MessageRole, Participant, ThreadId,
    ToolCall,
};
pub use plan::{Plan, PlanId, PlanProposal, Task, TaskId, TaskProposal};
pub use thread::{Thread, ThreadStatus};

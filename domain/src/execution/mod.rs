//! Plan execution state (ephemeral, one context per executing plan).

pub mod context;

pub use context::{
    PlanExecutionContext, PlanReport, PreviousTask, RoleBinding, SquadUpdate, TaskExecutionSquad,
    TaskReport, TaskState,
};

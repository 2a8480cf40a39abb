//! Orchestration parameters: scheduler limits.
//!
//! [`OrchestrationParams`] groups the static limits that govern task
//! scheduling in [`PlanExecutionStateManager`](crate::use_cases::state_manager::PlanExecutionStateManager)
//! and the plan/task pipelines. These are application-layer concerns, not
//! domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler limits.
///
/// | Limit | Default | Applies to |
/// |-------|---------|------------|
/// | `max_concurrent_tasks` | 3 | process-wide semaphore capacity |
/// | `task_timeout` | 120 s | each gated task execution |
/// | `max_task_attempts` | 3 | retry loop per task |
/// | `max_plan_depth` | 2 | nested plans spawned by tasks |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationParams {
    /// Maximum number of task executions in flight across all plans.
    pub max_concurrent_tasks: usize,
    /// Wall-clock budget for one gated task execution.
    pub task_timeout: Duration,
    /// Attempts before a task is forced to FAILED.
    pub max_task_attempts: u32,
    /// Deepest allowed nesting of plans within tasks (root plan is depth 0).
    pub max_plan_depth: usize,
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            task_timeout: Duration::from_secs(120),
            max_task_attempts: 3,
            max_plan_depth: 2,
        }
    }
}

impl OrchestrationParams {
    // ==================== Builder Methods ====================

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_max_task_attempts(mut self, max: u32) -> Self {
        self.max_task_attempts = max;
        self
    }

    pub fn with_max_plan_depth(mut self, depth: usize) -> Self {
        self.max_plan_depth = depth;
        self
    }
}

//! Per-plan scheduling state.
//!
//! A [`PlanExecutionContext`] lives for one plan execution and tracks, per
//! task, a [`TaskState`] (status, attempts, last error, output) and a
//! [`TaskExecutionSquad`] (the executor/validator/summarizer bindings).
//! All transitions are plain synchronous mutations; the application layer
//! owns locking and the concurrency gate.

use crate::agent::value_objects::AgentId;
use crate::core::error::DomainError;
use crate::interaction::value_objects::InteractionStatus;
use crate::plan::entities::Plan;
use crate::plan::value_objects::{PlanId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: InteractionStatus,
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

/// One role binding within a squad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub id: AgentId,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

impl RoleBinding {
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }
}

/// The three agents collaborating on one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecutionSquad {
    pub executor: RoleBinding,
    #[serde(default)]
    pub validator: Option<RoleBinding>,
    #[serde(default)]
    pub summarizer: Option<RoleBinding>,
}

impl TaskExecutionSquad {
    pub fn new(executor: impl Into<AgentId>) -> Self {
        Self {
            executor: RoleBinding::new(executor),
            validator: None,
            summarizer: None,
        }
    }
}

/// Partial update merged into a squad; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquadUpdate {
    pub executor_output: Option<serde_json::Value>,
    pub validator: Option<RoleBinding>,
    pub summarizer: Option<RoleBinding>,
}

impl SquadUpdate {
    pub fn executor(output: serde_json::Value) -> Self {
        Self {
            executor_output: Some(output),
            ..Default::default()
        }
    }

    pub fn validator(binding: RoleBinding) -> Self {
        Self {
            validator: Some(binding),
            ..Default::default()
        }
    }

    pub fn summarizer(binding: RoleBinding) -> Self {
        Self {
            summarizer: Some(binding),
            ..Default::default()
        }
    }
}

/// Output of a finished dependency, handed to the next task as a hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousTask {
    pub step: u32,
    pub instruction: String,
    pub output: serde_json::Value,
}

/// Row of the plan report passed to the final summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub step: u32,
    pub instruction: String,
    pub result: Option<serde_json::Value>,
    pub status: InteractionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub goal: String,
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanExecutionContext {
    pub plan: Plan,
    /// Nesting depth; 0 for a plan produced directly from a thread
    pub depth: usize,
    /// Task ids in plan order
    pub task_queue: VecDeque<TaskId>,
    pub dependency_map: BTreeMap<TaskId, Vec<TaskId>>,
    pub results: BTreeMap<TaskId, serde_json::Value>,
    pub task_states: BTreeMap<TaskId, TaskState>,
    pub squads: BTreeMap<TaskId, TaskExecutionSquad>,
}

impl PlanExecutionContext {
    pub fn new(plan: Plan, depth: usize) -> Self {
        let task_queue = plan.tasks.iter().map(|t| t.id.clone()).collect();
        let dependency_map = plan
            .tasks
            .iter()
            .map(|t| (t.id.clone(), t.dependencies.clone()))
            .collect();
        Self {
            plan,
            depth,
            task_queue,
            dependency_map,
            results: BTreeMap::new(),
            task_states: BTreeMap::new(),
            squads: BTreeMap::new(),
        }
    }

    pub fn plan_id(&self) -> &PlanId {
        &self.plan.id
    }

    /// Seed a PENDING state and a squad (executor = task target) for every task.
    pub fn initialize_task_states(&mut self) {
        for task in &self.plan.tasks {
            self.task_states.insert(task.id.clone(), TaskState::default());
            self.squads
                .insert(task.id.clone(), TaskExecutionSquad::new(task.target_agent.clone()));
        }
    }

    fn not_found(&self, task_id: &TaskId) -> DomainError {
        DomainError::TaskNotFound {
            plan: self.plan.id.to_string(),
            task: task_id.to_string(),
        }
    }

    pub fn task_state(&self, task_id: &TaskId) -> Option<&TaskState> {
        self.task_states.get(task_id)
    }

    pub fn squad(&self, task_id: &TaskId) -> Option<&TaskExecutionSquad> {
        self.squads.get(task_id)
    }

    pub fn status(&self, task_id: &TaskId) -> Option<InteractionStatus> {
        self.task_states.get(task_id).map(|s| s.status)
    }

    pub fn attempts(&self, task_id: &TaskId) -> u32 {
        self.task_states.get(task_id).map_or(0, |s| s.attempts)
    }

    /// Every dependency has succeeded and carries no error.
    pub fn validate_dependencies(&self, task_id: &TaskId) -> bool {
        let Some(deps) = self.dependency_map.get(task_id) else {
            return false;
        };
        deps.iter().all(|dep| {
            self.task_states.get(dep).is_some_and(|state| {
                state.status == InteractionStatus::Success && state.last_error.is_none()
            })
        })
    }

    pub fn is_task_ready(&self, task_id: &TaskId, max_attempts: u32) -> bool {
        self.validate_dependencies(task_id) && self.attempts(task_id) < max_attempts
    }

    /// Moves a task to IN_PROGRESS. Refuses while any dependency has not
    /// succeeded.
    pub fn mark_in_progress(&mut self, task_id: &TaskId) -> Result<(), DomainError> {
        if !self.task_states.contains_key(task_id) {
            return Err(self.not_found(task_id));
        }
        if !self.validate_dependencies(task_id) {
            return Err(DomainError::TaskNotReady(task_id.to_string()));
        }
        if let Some(state) = self.task_states.get_mut(task_id) {
            state.status = InteractionStatus::InProgress;
        }
        Ok(())
    }

    pub fn mark_failed(&mut self, task_id: &TaskId, reason: Option<String>) -> Result<(), DomainError> {
        let not_found = self.not_found(task_id);
        let state = self.task_states.get_mut(task_id).ok_or(not_found)?;
        state.status = InteractionStatus::Failed;
        if reason.is_some() {
            state.last_error = reason;
        }
        Ok(())
    }

    /// Terminal success: stores the output and clears any earlier error.
    pub fn record_result(&mut self, task_id: &TaskId, output: serde_json::Value) -> Result<(), DomainError> {
        let not_found = self.not_found(task_id);
        let state = self.task_states.get_mut(task_id).ok_or(not_found)?;
        state.status = InteractionStatus::Success;
        state.output = Some(output.clone());
        state.last_error = None;
        self.results.insert(task_id.clone(), output.clone());
        self.plan.complete_task(task_id, output);
        Ok(())
    }

    /// Counts a failed attempt. Status is left for the caller to decide.
    /// Returns the new attempt count.
    pub fn record_error(&mut self, task_id: &TaskId, error: impl Into<String>) -> Result<u32, DomainError> {
        let not_found = self.not_found(task_id);
        let state = self.task_states.get_mut(task_id).ok_or(not_found)?;
        state.attempts += 1;
        state.last_error = Some(error.into());
        Ok(state.attempts)
    }

    pub fn update_squad(&mut self, task_id: &TaskId, update: SquadUpdate) -> Result<(), DomainError> {
        let not_found = self.not_found(task_id);
        let squad = self.squads.get_mut(task_id).ok_or(not_found)?;
        if let Some(output) = update.executor_output {
            squad.executor.output = Some(output);
        }
        if let Some(validator) = update.validator {
            squad.validator = Some(validator);
        }
        if let Some(summarizer) = update.summarizer {
            squad.summarizer = Some(summarizer);
        }
        Ok(())
    }

    /// Outputs of the task's dependencies, matched to sibling tasks by step.
    pub fn previous_tasks(&self, task_id: &TaskId) -> Vec<PreviousTask> {
        let Some(task) = self.plan.task(task_id) else {
            return Vec::new();
        };
        task.dependencies
            .iter()
            .filter_map(|dep| self.plan.task(dep))
            .filter_map(|dep| {
                let sibling = self.plan.task_by_step(dep.step)?;
                let output = self.task_states.get(&sibling.id)?.output.clone()?;
                Some(PreviousTask {
                    step: sibling.step,
                    instruction: sibling.instruction.clone(),
                    output,
                })
            })
            .collect()
    }

    pub fn report(&self) -> PlanReport {
        PlanReport {
            goal: self.plan.goal.clone(),
            tasks: self
                .plan
                .tasks
                .iter()
                .map(|task| {
                    let state = self.task_states.get(&task.id);
                    TaskReport {
                        step: task.step,
                        instruction: task.instruction.clone(),
                        result: state.and_then(|s| s.output.clone()),
                        status: state.map(|s| s.status).unwrap_or_default(),
                    }
                })
                .collect(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.task_states
            .values()
            .any(|s| s.status == InteractionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entities::Task;
    use serde_json::json;

    fn context() -> PlanExecutionContext {
        let plan = Plan::new("p1", "Budget", "")
            .with_task(Task::new("t1", 1, "Fetch", "plaid"))
            .with_task(Task::new("t2", 2, "Write", "sheets").with_dependency("t1"))
            .with_task(Task::new("t3", 3, "Share", "drive").with_dependency("t2"));
        let mut ctx = PlanExecutionContext::new(plan, 0);
        ctx.initialize_task_states();
        ctx
    }

    #[test]
    fn test_initialize_seeds_state_and_squad_for_every_task() {
        let ctx = context();
        assert_eq!(ctx.task_queue.len(), 3);
        for id in ctx.plan.task_ids() {
            let state = ctx.task_state(&id).unwrap();
            assert_eq!(state.status, InteractionStatus::Pending);
            assert_eq!(state.attempts, 0);
            assert!(ctx.squad(&id).is_some());
        }
        assert_eq!(ctx.squad(&"t2".into()).unwrap().executor.id.as_str(), "sheets");
    }

    #[test]
    fn test_readiness_follows_dependencies() {
        let mut ctx = context();
        let (t1, t2) = (TaskId::new("t1"), TaskId::new("t2"));
        assert!(ctx.is_task_ready(&t1, 3));
        assert!(!ctx.is_task_ready(&t2, 3));
        assert!(ctx.mark_in_progress(&t2).is_err());

        ctx.mark_in_progress(&t1).unwrap();
        ctx.record_result(&t1, json!("rows")).unwrap();
        assert!(ctx.is_task_ready(&t2, 3));
        assert!(ctx.plan.completed.contains(&t1));
    }

    #[test]
    fn test_record_error_counts_attempts_and_keeps_status() {
        let mut ctx = context();
        let t1 = TaskId::new("t1");
        ctx.mark_in_progress(&t1).unwrap();
        assert_eq!(ctx.record_error(&t1, "unsatisfied").unwrap(), 1);
        assert_eq!(ctx.record_error(&t1, "unsatisfied").unwrap(), 2);
        assert_eq!(ctx.status(&t1), Some(InteractionStatus::InProgress));
        assert!(ctx.is_task_ready(&t1, 3));
        ctx.record_error(&t1, "unsatisfied").unwrap();
        assert!(!ctx.is_task_ready(&t1, 3));
    }

    #[test]
    fn test_dependency_with_error_is_not_satisfied() {
        let mut ctx = context();
        let (t1, t2) = (TaskId::new("t1"), TaskId::new("t2"));
        ctx.record_result(&t1, json!("ok")).unwrap();
        ctx.task_states.get_mut(&t1).unwrap().last_error = Some("late failure".into());
        assert!(!ctx.validate_dependencies(&t2));
    }

    #[test]
    fn test_update_squad_merges_partially() {
        let mut ctx = context();
        let t1 = TaskId::new("t1");
        ctx.update_squad(&t1, SquadUpdate::executor(json!("raw"))).unwrap();
        ctx.update_squad(&t1, SquadUpdate::validator(RoleBinding::new("judge")))
            .unwrap();

        let squad = ctx.squad(&t1).unwrap();
        assert_eq!(squad.executor.output, Some(json!("raw")));
        assert_eq!(squad.validator.as_ref().unwrap().id.as_str(), "judge");
        assert!(squad.summarizer.is_none());
    }

    #[test]
    fn test_previous_tasks_and_report() {
        let mut ctx = context();
        let (t1, t2) = (TaskId::new("t1"), TaskId::new("t2"));
        ctx.record_result(&t1, json!("42 transactions")).unwrap();

        let previous = ctx.previous_tasks(&t2);
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0].step, 1);
        assert_eq!(previous[0].output, json!("42 transactions"));

        ctx.mark_failed(&t2, Some("gave up".into())).unwrap();
        let report = ctx.report();
        assert_eq!(report.goal, "Budget");
        assert_eq!(report.tasks[0].status, InteractionStatus::Success);
        assert_eq!(report.tasks[1].status, InteractionStatus::Failed);
        assert_eq!(report.tasks[2].status, InteractionStatus::Pending);
        assert!(ctx.has_failures());
    }

    #[test]
    fn test_unknown_task_errors() {
        let mut ctx = context();
        let ghost = TaskId::new("ghost");
        assert!(matches!(
            ctx.record_error(&ghost, "x"),
            Err(DomainError::TaskNotFound { .. })
        ));
        assert!(!ctx.validate_dependencies(&ghost));
    }
}

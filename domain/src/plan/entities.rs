//! Plan domain entities

use super::value_objects::{PlanId, TaskId};
use crate::agent::value_objects::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single unit of work within a plan, assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Owning plan
    pub plan_id: PlanId,
    /// 1-based position in the plan as emitted by the planner
    pub step: u32,
    pub instruction: String,
    /// Sibling tasks that must succeed first
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Agent that executes this task
    pub target_agent: AgentId,
    /// Opaque result once the task has succeeded
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Hints extracted during planning
    #[serde(default)]
    pub key_inputs: Vec<String>,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        step: u32,
        instruction: impl Into<String>,
        target_agent: impl Into<AgentId>,
    ) -> Self {
        Self {
            id: id.into(),
            plan_id: PlanId::new(""),
            step,
            instruction: instruction.into(),
            dependencies: Vec::new(),
            target_agent: target_agent.into(),
            result: None,
            key_inputs: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, task_id: impl Into<TaskId>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    pub fn with_key_input(mut self, hint: impl Into<String>) -> Self {
        self.key_inputs.push(hint.into());
        self
    }
}

/// A goal plus an ordered task graph.
///
/// Tasks are kept in the order the planner emitted them; execution follows
/// this order rather than a topological sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub goal: String,
    #[serde(default)]
    pub reasoning: String,
    pub tasks: Vec<Task>,
    /// Ids of tasks that finished with SUCCESS
    #[serde(default)]
    pub completed: BTreeSet<TaskId>,
}

impl Plan {
    pub fn new(id: impl Into<PlanId>, goal: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            reasoning: reasoning.into(),
            tasks: Vec::new(),
            completed: BTreeSet::new(),
        }
    }

    /// Appends a task, binding it to this plan.
    pub fn with_task(mut self, task: Task) -> Self {
        self.add_task(task);
        self
    }

    pub fn add_task(&mut self, mut task: Task) {
        task.plan_id = self.id.clone();
        self.tasks.push(task);
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn task_by_step(&self, step: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.step == step)
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// Marks a task as completed and stores its result.
    pub fn complete_task(&mut self, id: &TaskId, result: serde_json::Value) {
        if let Some(task) = self.task_mut(id) {
            task.result = Some(result);
            self.completed.insert(id.clone());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| self.completed.contains(&t.id))
    }

    /// Completion progress (completed / total)
    pub fn progress(&self) -> (usize, usize) {
        (self.completed.len(), self.tasks.len())
    }

    /// Dependencies that do not name a sibling task.
    pub fn dangling_dependencies(&self) -> Vec<(TaskId, TaskId)> {
        let mut dangling = Vec::new();
        for task in &self.tasks {
            for dep in &task.dependencies {
                if self.task(dep).is_none() {
                    dangling.push((task.id.clone(), dep.clone()));
                }
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        Plan::new("plan-1", "Build a budget", "Collect then summarize")
            .with_task(Task::new("t1", 1, "Fetch transactions", "plaid"))
            .with_task(Task::new("t2", 2, "Write sheet", "sheets").with_dependency("t1"))
    }

    #[test]
    fn test_add_task_binds_plan_id() {
        let plan = sample_plan();
        assert!(plan.tasks.iter().all(|t| t.plan_id == plan.id));
        assert_eq!(plan.task_by_step(2).unwrap().id.as_str(), "t2");
    }

    #[test]
    fn test_progress_and_completion() {
        let mut plan = sample_plan();
        assert_eq!(plan.progress(), (0, 2));
        plan.complete_task(&"t1".into(), serde_json::json!("42 rows"));
        assert_eq!(plan.progress(), (1, 2));
        assert!(!plan.is_complete());
        assert_eq!(
            plan.task(&"t1".into()).unwrap().result,
            Some(serde_json::json!("42 rows"))
        );
        plan.complete_task(&"t2".into(), serde_json::json!("done"));
        assert!(plan.is_complete());
    }

    #[test]
    fn test_complete_unknown_task_is_ignored() {
        let mut plan = sample_plan();
        plan.complete_task(&"nope".into(), serde_json::json!(null));
        assert_eq!(plan.progress(), (0, 2));
    }

    #[test]
    fn test_dangling_dependencies() {
        let plan = sample_plan().with_task(Task::new("t3", 3, "x", "a").with_dependency("t9"));
        assert_eq!(
            plan.dangling_dependencies(),
            vec![(TaskId::new("t3"), TaskId::new("t9"))]
        );
    }
}

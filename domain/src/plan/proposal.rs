//! Plan proposals as emitted by a planning chain.
//!
//! A [`PlanProposal`] is the raw, step-numbered task list a planner returns.
//! It becomes a [`Plan`] only through [`PlanProposal::materialize`], which
//! assigns ids and resolves step references to sibling task ids in one go,
//! so a plan and its tasks always come into existence together.
//!
//! Expected JSON schema:
//! ```json
//! {
//!   "goal": "string",
//!   "reasoning": "string (optional)",
//!   "tasks": [
//!     {
//!       "step": 1,
//!       "instruction": "string",
//!       "dependencies": [1, "2"],
//!       "agent": "agent-id (optional)",
//!       "keyInputs": ["hint", ...]
//!     }
//!   ]
//! }
//! ```

use super::entities::{Plan, Task};
use super::value_objects::{PlanId, TaskId};
use crate::agent::value_objects::AgentId;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProposal {
    pub step: u32,
    pub instruction: String,
    /// Step numbers of prerequisite tasks
    #[serde(default)]
    pub dependencies: Vec<u32>,
    #[serde(default)]
    pub agent: Option<AgentId>,
    #[serde(default)]
    pub key_inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanProposal {
    pub goal: String,
    #[serde(default)]
    pub reasoning: String,
    pub tasks: Vec<TaskProposal>,
}

/// Numbers and numeric strings are accepted as step references.
fn json_to_step(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().trim_start_matches("step-").parse().ok(),
        _ => None,
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn first_of<'a>(json: &'a serde_json::Value, keys: &[&str]) -> Option<&'a serde_json::Value> {
    keys.iter().find_map(|k| json.get(*k))
}

impl PlanProposal {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            reasoning: String::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: TaskProposal) -> Self {
        self.tasks.push(task);
        self
    }

    /// Parse a proposal from a planner's JSON output.
    ///
    /// Missing step numbers default to the task's 1-based position.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, DomainError> {
        let goal = json
            .get("goal")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DomainError::InvalidPlan("missing goal".to_string()))?;
        let reasoning = json
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let tasks_json = json
            .get("tasks")
            .and_then(|v| v.as_array())
            .ok_or_else(|| DomainError::InvalidPlan("missing tasks array".to_string()))?;

        let mut tasks = Vec::with_capacity(tasks_json.len());
        for (index, task_json) in tasks_json.iter().enumerate() {
            let step = task_json
                .get("step")
                .and_then(json_to_step)
                .unwrap_or(index as u32 + 1);
            let instruction = first_of(task_json, &["instruction", "description"])
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let dependencies = first_of(task_json, &["dependencies", "depends_on", "dependsOn"])
                .and_then(|v| v.as_array())
                .map(|deps| deps.iter().filter_map(json_to_step).collect())
                .unwrap_or_default();

            let agent = first_of(task_json, &["agent", "targetAgent", "target_agent"])
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(AgentId::new);

            let key_inputs = string_list(first_of(task_json, &["keyInputs", "key_inputs"]));

            tasks.push(TaskProposal {
                step,
                instruction,
                dependencies,
                agent,
                key_inputs,
            });
        }

        let proposal = Self {
            goal: goal.to_string(),
            reasoning: reasoning.to_string(),
            tasks,
        };
        proposal.validate()?;
        Ok(proposal)
    }

    /// Structural checks: non-empty goal and tasks, unique steps, and
    /// dependencies that point at other sibling steps.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.goal.trim().is_empty() {
            return Err(DomainError::InvalidPlan("goal is empty".to_string()));
        }
        if self.tasks.is_empty() {
            return Err(DomainError::InvalidPlan("plan has no tasks".to_string()));
        }

        let mut steps = HashSet::new();
        for task in &self.tasks {
            if task.instruction.trim().is_empty() {
                return Err(DomainError::InvalidPlan(format!(
                    "step {} has no instruction",
                    task.step
                )));
            }
            if !steps.insert(task.step) {
                return Err(DomainError::InvalidPlan(format!(
                    "duplicate step {}",
                    task.step
                )));
            }
        }

        for task in &self.tasks {
            for dep in &task.dependencies {
                if *dep == task.step {
                    return Err(DomainError::InvalidPlan(format!(
                        "step {} depends on itself",
                        task.step
                    )));
                }
                if !steps.contains(dep) {
                    return Err(DomainError::InvalidPlan(format!(
                        "step {} depends on unknown step {}",
                        task.step, dep
                    )));
                }
            }
        }
        Ok(())
    }

    /// Turn the proposal into a [`Plan`], generating task ids and resolving
    /// step references. Tasks without an explicit agent are assigned to
    /// `default_agent`.
    pub fn materialize(&self, plan_id: PlanId, default_agent: &AgentId) -> Result<Plan, DomainError> {
        self.validate()?;

        let ids: HashMap<u32, TaskId> = self
            .tasks
            .iter()
            .map(|t| (t.step, TaskId::generate()))
            .collect();

        let mut plan = Plan::new(plan_id, self.goal.clone(), self.reasoning.clone());
        for proposal in &self.tasks {
            let agent = proposal
                .agent
                .clone()
                .unwrap_or_else(|| default_agent.clone());
            let mut task = Task::new(ids[&proposal.step].clone(), proposal.step, &proposal.instruction, agent);
            task.dependencies = proposal
                .dependencies
                .iter()
                .map(|step| ids[step].clone())
                .collect();
            task.key_inputs = proposal.key_inputs.clone();
            plan.add_task(task);
        }
        Ok(plan)
    }
}

impl TaskProposal {
    pub fn new(step: u32, instruction: impl Into<String>) -> Self {
        Self {
            step,
            instruction: instruction.into(),
            dependencies: Vec::new(),
            agent: None,
            key_inputs: Vec::new(),
        }
    }

    pub fn after(mut self, step: u32) -> Self {
        self.dependencies.push(step);
        self
    }

    pub fn on(mut self, agent: impl Into<AgentId>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_full() {
        let proposal = PlanProposal::from_json(&json!({
            "goal": "Monthly budget",
            "reasoning": "fetch then write",
            "tasks": [
                {"step": 1, "instruction": "Fetch transactions", "agent": "plaid", "keyInputs": ["last 30 days"]},
                {"step": "2", "instruction": "Write the sheet", "dependencies": [1]}
            ]
        }))
        .unwrap();

        assert_eq!(proposal.goal, "Monthly budget");
        assert_eq!(proposal.tasks.len(), 2);
        assert_eq!(proposal.tasks[0].agent, Some(AgentId::new("plaid")));
        assert_eq!(proposal.tasks[0].key_inputs, vec!["last 30 days"]);
        assert_eq!(proposal.tasks[1].step, 2);
        assert_eq!(proposal.tasks[1].dependencies, vec![1]);
    }

    #[test]
    fn test_from_json_defaults_step_to_position() {
        let proposal = PlanProposal::from_json(&json!({
            "goal": "g",
            "tasks": [{"description": "a"}, {"description": "b", "depends_on": ["1"]}]
        }))
        .unwrap();
        assert_eq!(proposal.tasks[0].step, 1);
        assert_eq!(proposal.tasks[1].step, 2);
        assert_eq!(proposal.tasks[1].instruction, "b");
    }

    #[test]
    fn test_rejects_empty_and_broken_plans() {
        assert!(PlanProposal::from_json(&json!({"goal": "g", "tasks": []})).is_err());
        assert!(PlanProposal::from_json(&json!({"tasks": [{"instruction": "x"}]})).is_err());
        assert!(
            PlanProposal::from_json(&json!({
                "goal": "g",
                "tasks": [{"step": 1, "instruction": "a", "dependencies": [7]}]
            }))
            .is_err()
        );
        assert!(
            PlanProposal::from_json(&json!({
                "goal": "g",
                "tasks": [{"step": 1, "instruction": "a"}, {"step": 1, "instruction": "b"}]
            }))
            .is_err()
        );
    }

    #[test]
    fn test_materialize_resolves_steps_to_ids() {
        let proposal = PlanProposal::new("g")
            .with_task(TaskProposal::new(1, "first").on("plaid"))
            .with_task(TaskProposal::new(2, "second").after(1));

        let plan = proposal
            .materialize(PlanId::new("p1"), &AgentId::new("planner"))
            .unwrap();

        let first = plan.task_by_step(1).unwrap();
        let second = plan.task_by_step(2).unwrap();
        assert_eq!(first.target_agent.as_str(), "plaid");
        assert_eq!(second.target_agent.as_str(), "planner");
        assert_eq!(second.dependencies, vec![first.id.clone()]);
        assert!(plan.tasks.iter().all(|t| t.plan_id.as_str() == "p1"));
        assert!(plan.dangling_dependencies().is_empty());
    }
}

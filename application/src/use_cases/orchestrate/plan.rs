//! Plan execution pipeline.
//!
//! validation → initialization → task loop → summary. Tasks run strictly in
//! plan order; a task that cannot succeed halts the loop, and the summary
//! is produced regardless.

use super::OrchestrationManager;
use super::pipeline::{Pipeline, PipelineStep};
use super::prompts;
use super::types::{ErrorScope, OrchestrationError, PlanOutcome, TaskRequest};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use triad_domain::core::string::{single_line, truncate};
use triad_domain::{
    AgentId, AgentRole, ChainInput, ChainResult, Interaction, InteractionPayload,
    InteractionStatus, InteractionType, Message, Participant, Plan, PlanId, PlanReport, Task,
    Thread,
};

pub(crate) struct PlanRun {
    /// Taken by the initialization step
    pub plan: Option<Plan>,
    pub plan_id: PlanId,
    pub goal: String,
    pub requester: Participant,
    pub initiator: AgentId,
    pub depth: usize,
    pub total: usize,
    pub halted: bool,
    pub summary: Option<String>,
}

impl PlanRun {
    pub fn new(plan: Plan, requester: Participant, initiator: AgentId, depth: usize) -> Self {
        Self {
            plan_id: plan.id.clone(),
            goal: plan.goal.clone(),
            total: plan.tasks.len(),
            plan: Some(plan),
            requester,
            initiator,
            depth,
            halted: false,
            summary: None,
        }
    }

    pub fn into_outcome(self, manager: &OrchestrationManager) -> Result<PlanOutcome, OrchestrationError> {
        let plan = manager.state_manager().plan(&self.plan_id)?;
        let (completed, total) = plan.progress();
        Ok(PlanOutcome {
            summary: self.summary.unwrap_or_default(),
            succeeded: !self.halted && plan.is_complete(),
            completed,
            total,
            plan_id: self.plan_id,
        })
    }
}

pub(crate) fn pipeline() -> Pipeline<PlanRun> {
    Pipeline::new("plan-execution")
        .step(PlanValidationStep)
        .step(PlanInitializationStep)
        .step(TaskLoopStep)
        .step(PlanSummaryStep)
}

struct PlanValidationStep;

#[async_trait]
impl PipelineStep<PlanRun> for PlanValidationStep {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut PlanRun,
    ) -> Result<(), OrchestrationError> {
        manager.registry().require_agent(&ctx.initiator)?;

        let max = manager.params().max_plan_depth;
        if ctx.depth > max {
            return Err(OrchestrationError::PlanDepthExceeded {
                depth: ctx.depth,
                max,
            });
        }

        let Some(plan) = &ctx.plan else {
            return Err(OrchestrationError::Validation(format!(
                "plan {} was already started",
                ctx.plan_id
            )));
        };
        if plan.tasks.is_empty() {
            return Err(OrchestrationError::Validation(format!(
                "plan {} has no tasks",
                plan.id
            )));
        }
        if let Some((task, dep)) = plan.dangling_dependencies().into_iter().next() {
            return Err(OrchestrationError::Validation(format!(
                "task {} depends on unknown task {}",
                task, dep
            )));
        }
        Ok(())
    }
}

struct PlanInitializationStep;

#[async_trait]
impl PipelineStep<PlanRun> for PlanInitializationStep {
    fn name(&self) -> &'static str {
        "initialization"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut PlanRun,
    ) -> Result<(), OrchestrationError> {
        let Some(plan) = ctx.plan.take() else {
            return Ok(());
        };
        let state = manager.state_manager();
        let plan_id = state.create_context(plan, ctx.depth)?;
        state.initialize_task_states(&plan_id)?;

        info!(plan = %plan_id, depth = ctx.depth, tasks = ctx.total, "Plan initialized");
        manager
            .status()
            .set_working_status(&format!("Working on: {}", truncate(&single_line(&ctx.goal), 80)));
        Ok(())
    }
}

struct TaskLoopStep;

#[async_trait]
impl PipelineStep<PlanRun> for TaskLoopStep {
    fn name(&self) -> &'static str {
        "task-loop"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut PlanRun,
    ) -> Result<(), OrchestrationError> {
        let tasks = manager.state_manager().plan(&ctx.plan_id)?.tasks;
        for (index, task) in tasks.iter().enumerate() {
            let succeeded = run_task(manager, thread, ctx, task, index + 1).await?;
            if !succeeded {
                warn!(plan = %ctx.plan_id, task = %task.id, step = task.step, "Halting plan");
                ctx.halted = true;
                break;
            }
        }
        Ok(())
    }
}

/// Drive one task through its retry loop. Returns whether it succeeded.
async fn run_task(
    manager: &OrchestrationManager,
    thread: &mut Thread,
    ctx: &PlanRun,
    task: &Task,
    position: usize,
) -> Result<bool, OrchestrationError> {
    let state = manager.state_manager();
    let plan_id = &ctx.plan_id;

    if !state.validate_dependencies(plan_id, &task.id)? {
        let error = OrchestrationError::Dependency {
            task: task.id.clone(),
        };
        manager.error_handler().handle(ErrorScope::task(), &error);
        state.mark_failed(plan_id, &task.id, Some(error.to_string()))?;
        manager
            .status()
            .append_working_status(&format!(" (step {} blocked by unmet dependencies)", task.step));
        return Ok(false);
    }

    let previous = state.previous_tasks(plan_id, &task.id)?;
    let max_attempts = manager.params().max_task_attempts;
    let mut missing: Vec<String> = Vec::new();

    for attempt in 1..=max_attempts {
        if !state.is_task_ready(plan_id, &task.id)? {
            break;
        }
        state.mark_in_progress(plan_id, &task.id)?;
        manager.status().set_working_status(&format!(
            "Step {}/{}: {} (attempt {}/{})",
            position,
            ctx.total,
            truncate(&single_line(&task.instruction), 60),
            attempt,
            max_attempts
        ));
        info!(plan = %plan_id, task = %task.id, attempt, "Running task");

        let request = TaskRequest {
            plan_id: plan_id.clone(),
            task_id: task.id.clone(),
            input: prompts::task_input(&ctx.goal, task, &missing, &previous),
            missing: missing.clone(),
            assigned_by: Participant::agent(ctx.initiator.clone()),
        };
        match manager.execute_task(thread, request).await {
            Ok(outcome) if outcome.judgement.satisfied => return Ok(true),
            Ok(outcome) => {
                info!(
                    task = %task.id,
                    attempt,
                    score = outcome.judgement.score,
                    "Result judged insufficient"
                );
                missing = outcome.judgement.analysis.missing;
            }
            Err(error) => {
                let decision = manager.error_handler().handle(ErrorScope::task(), &error);
                if !decision.retryable || error.ends_task() {
                    break;
                }
            }
        }
    }

    state.mark_failed(plan_id, &task.id, None)?;
    warn!(
        plan = %plan_id,
        task = %task.id,
        attempts = state.attempts(plan_id, &task.id)?,
        "Task failed"
    );
    Ok(false)
}

/// Ask the shared summarizer for a goal-directed answer from the task
/// report. Falls back to a plain recap if the summarizer cannot answer.
struct PlanSummaryStep;

#[async_trait]
impl PipelineStep<PlanRun> for PlanSummaryStep {
    fn name(&self) -> &'static str {
        "summary"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut PlanRun,
    ) -> Result<(), OrchestrationError> {
        let report = manager.state_manager().report(&ctx.plan_id)?;

        let answer = match summarize(manager, &report).await {
            Ok((summarizer, text)) => (Participant::agent(summarizer), text),
            Err(error) => {
                manager
                    .error_handler()
                    .handle(ErrorScope::interaction(InteractionType::Plan), &error);
                (
                    Participant::agent(ctx.initiator.clone()),
                    prompts::fallback_plan_summary(&report),
                )
            }
        };
        let (source, text) = answer;

        let message = Interaction::new(
            thread.id.clone(),
            source,
            ctx.requester.clone(),
            InteractionPayload::Message(Message::assistant(text.clone())),
        )
        .with_status(InteractionStatus::Success);
        thread.append(message);

        manager
            .status()
            .set_working_status(&format!("Done: {}", truncate(&single_line(&ctx.goal), 80)));
        ctx.summary = Some(text);
        Ok(())
    }
}

async fn summarize(
    manager: &OrchestrationManager,
    report: &PlanReport,
) -> Result<(AgentId, String), OrchestrationError> {
    let summarizer = manager.specialist(AgentRole::Summarizer).await?;
    let prompt = prompts::plan_summary_prompt(report);
    let input = ChainInput::for_chain(summarizer.chain_type, &prompt);
    let (_, result) = manager
        .run_chain(&summarizer, input, CancellationToken::new())
        .await?;
    let text = match result {
        ChainResult::Message(text) => text,
        other => other.render(),
    };
    Ok((summarizer.id, text))
}

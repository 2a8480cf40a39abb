//! Task execution pipeline.
//!
//! One attempt of one task, run inside the task gate:
//! readiness → executor chain → result dispatch → summarization →
//! validation → finalization. A failing step records the attempt on the
//! plan context (dependency errors excepted) and fails the TASK interaction.

use super::OrchestrationManager;
use super::pipeline::{Pipeline, PipelineStep, RecoveryStep};
use super::prompts;
use super::types::{ErrorScope, OrchestrationError, TaskOutcome, TaskRequest};
use crate::use_cases::state_manager::TaskSlot;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use triad_domain::{
    Agent, AgentRole, ChainExecutionResult, ChainInput, ChainResult, ErrorClass, ErrorCode,
    Interaction, InteractionError, InteractionId, InteractionPayload, InteractionStatus,
    Judgement, Participant, PlanId, RoleBinding, SquadUpdate, Task, Thread,
};

pub(crate) struct TaskRun {
    pub request: TaskRequest,
    pub task: Task,
    /// Depth of the plan owning this task
    pub depth: usize,
    /// TASK interaction recording this attempt
    pub interaction_id: InteractionId,
    pub cancel: CancellationToken,
    /// Place in the task gate, set once the attempt is admitted
    pub slot: Option<TaskSlot>,
    pub executor: Option<Agent>,
    pub chain: Option<ChainExecutionResult>,
    pub result: Option<ChainResult>,
    pub raw_output: Option<Value>,
    pub summary: Option<String>,
    pub judgement: Option<Judgement>,
}

impl TaskRun {
    pub fn new(request: TaskRequest, task: Task, depth: usize, interaction_id: InteractionId) -> Self {
        Self {
            request,
            task,
            depth,
            interaction_id,
            cancel: CancellationToken::new(),
            slot: None,
            executor: None,
            chain: None,
            result: None,
            raw_output: None,
            summary: None,
            judgement: None,
        }
    }

    fn plan_id(&self) -> &PlanId {
        &self.request.plan_id
    }

    fn executor(&self) -> Result<&Agent, OrchestrationError> {
        self.executor
            .as_ref()
            .ok_or_else(|| OrchestrationError::Validation("executor not resolved".to_string()))
    }

    fn executor_participant(&self) -> Participant {
        Participant::agent(self.task.target_agent.clone())
    }

    pub fn into_outcome(self) -> Result<TaskOutcome, OrchestrationError> {
        let missing = |what: &str| {
            OrchestrationError::Validation(format!("task {} finished without {}", self.task.id, what))
        };
        let chain = self.chain.clone().ok_or_else(|| missing("an executor result"))?;
        let output = self.summary.clone().ok_or_else(|| missing("a summary"))?;
        let judgement = self.judgement.clone().ok_or_else(|| missing("a judgement"))?;
        Ok(TaskOutcome {
            task_id: self.task.id,
            chain,
            output,
            judgement,
        })
    }
}

pub(crate) fn pipeline() -> Pipeline<TaskRun> {
    Pipeline::new("task-execution")
        .step(ReadinessStep)
        .step(ExecutorChainStep)
        .step(ToolCallDispatchStep)
        .step(NestedPlanDispatchStep)
        .step(DirectDispatchStep)
        .step(SummarizationStep)
        .step(ValidationStep)
        .step(FinalizationStep)
        .recover_with(TaskErrorStep)
}

struct ReadinessStep;

#[async_trait]
impl PipelineStep<TaskRun> for ReadinessStep {
    fn name(&self) -> &'static str {
        "readiness"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        if !manager.state_manager().is_task_ready(ctx.plan_id(), &ctx.task.id)? {
            return Err(OrchestrationError::Dependency {
                task: ctx.task.id.clone(),
            });
        }
        Ok(())
    }
}

struct ExecutorChainStep;

#[async_trait]
impl PipelineStep<TaskRun> for ExecutorChainStep {
    fn name(&self) -> &'static str {
        "executor-chain"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let agent = manager.registry().require_agent(&ctx.task.target_agent)?;
        if let Some(interaction) = thread.interaction_mut(&ctx.interaction_id) {
            interaction.start();
        }

        let input = ChainInput::for_chain(agent.chain_type, &ctx.request.input);
        let (envelope, result) = manager.run_chain(&agent, input, ctx.cancel.clone()).await?;
        debug!(
            task = %ctx.task.id,
            kind = result.interaction_type().as_str(),
            elapsed_ms = envelope.execution_time.as_millis() as u64,
            "Executor chain returned"
        );

        manager.state_manager().update_task_squad(
            ctx.plan_id(),
            &ctx.task.id,
            SquadUpdate::executor(result.to_value()),
        )?;
        ctx.executor = Some(agent);
        ctx.chain = Some(envelope);
        ctx.result = Some(result);
        Ok(())
    }
}

struct ToolCallDispatchStep;

#[async_trait]
impl PipelineStep<TaskRun> for ToolCallDispatchStep {
    fn name(&self) -> &'static str {
        "dispatch-tool-call"
    }

    fn applies_to(&self, ctx: &TaskRun) -> bool {
        matches!(ctx.result, Some(ChainResult::ToolCall(_)))
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let Some(ChainResult::ToolCall(call)) = &ctx.result else {
            return Ok(());
        };
        let mut call = call.clone();
        call.validate()?;

        let agent = ctx.executor()?;
        let executor = manager.resolve_tool(agent, &call.tool)?;
        debug!(task = %ctx.task.id, tool = %call.tool, function = %call.function, "Executing tool call");
        let output = tokio::select! {
            output = executor.execute(&call.function, &call.parameters) => output?,
            _ = ctx.cancel.cancelled() => return Err(OrchestrationError::Cancelled),
        };
        call.result = Some(output.clone());

        let source = ctx.executor_participant();
        let interaction = Interaction::new(
            thread.id.clone(),
            source.clone(),
            source,
            InteractionPayload::ToolCall(call),
        )
        .with_status(InteractionStatus::Success);
        thread.append(interaction);
        ctx.raw_output = Some(output);
        Ok(())
    }
}

/// A task that answered with a plan runs it one level deeper; the nested
/// summary becomes the task's raw result. The task's gate slot is handed
/// back for the duration of the nested plan.
struct NestedPlanDispatchStep;

#[async_trait]
impl PipelineStep<TaskRun> for NestedPlanDispatchStep {
    fn name(&self) -> &'static str {
        "dispatch-plan"
    }

    fn applies_to(&self, ctx: &TaskRun) -> bool {
        matches!(ctx.result, Some(ChainResult::Plan(_)))
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let Some(ChainResult::Plan(proposal)) = &ctx.result else {
            return Ok(());
        };
        proposal.validate()?;
        let agent_id = ctx.task.target_agent.clone();
        let plan = proposal.materialize(PlanId::generate(), &agent_id)?;
        let depth = ctx.depth + 1;
        info!(task = %ctx.task.id, plan = %plan.id, depth, "Task produced a nested plan");

        let participant = ctx.executor_participant();
        let interaction = Interaction::new(
            thread.id.clone(),
            participant.clone(),
            participant.clone(),
            InteractionPayload::Plan(plan.clone()),
        )
        .with_status(InteractionStatus::InProgress);
        let plan_interaction = thread.append(interaction);

        let nested = manager.execute_plan_at_depth(thread, plan, participant, agent_id, depth);
        let outcome = match ctx.slot.as_mut() {
            Some(slot) => slot.released_while(nested).await.and_then(|outcome| outcome),
            None => nested.await,
        };
        match outcome {
            Ok(outcome) => {
                if let Some(interaction) = thread.interaction_mut(&plan_interaction) {
                    settle_plan_interaction(interaction, outcome.succeeded, outcome.completed, outcome.total);
                }
                ctx.raw_output = Some(Value::String(outcome.summary));
                Ok(())
            }
            Err(e) => {
                let scope = ErrorScope::interaction(triad_domain::InteractionType::Plan);
                let record = manager.error_handler().classify(scope, &e).to_interaction_error();
                if let Some(interaction) = thread.interaction_mut(&plan_interaction) {
                    interaction.fail(record);
                }
                Err(e)
            }
        }
    }
}

/// Close a PLAN interaction after its plan ran.
pub(crate) fn settle_plan_interaction(
    interaction: &mut Interaction,
    succeeded: bool,
    completed: usize,
    total: usize,
) {
    if succeeded {
        interaction.succeed();
    } else {
        interaction.fail(InteractionError::new(
            ErrorCode::TaskExecution,
            format!("{} of {} tasks completed", completed, total),
        ));
    }
}

struct DirectDispatchStep;

#[async_trait]
impl PipelineStep<TaskRun> for DirectDispatchStep {
    fn name(&self) -> &'static str {
        "dispatch-direct"
    }

    fn applies_to(&self, ctx: &TaskRun) -> bool {
        matches!(
            ctx.result,
            Some(ChainResult::Judgement(_)) | Some(ChainResult::Message(_))
        )
    }

    async fn execute(
        &self,
        _manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        ctx.raw_output = ctx.result.as_ref().map(ChainResult::to_value);
        Ok(())
    }
}

struct SummarizationStep;

#[async_trait]
impl PipelineStep<TaskRun> for SummarizationStep {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let summarizer = manager.specialist(AgentRole::Summarizer).await?;
        let raw = ctx.raw_output.clone().unwrap_or(Value::Null);
        let prompt = prompts::task_summary_prompt(&ctx.task.instruction, &raw, &ctx.request.missing);
        let input = ChainInput::for_chain(summarizer.chain_type, &prompt);
        let (_, result) = manager.run_chain(&summarizer, input, ctx.cancel.clone()).await?;
        let summary = match result {
            ChainResult::Message(text) => text,
            other => other.render(),
        };

        manager.state_manager().update_task_squad(
            ctx.plan_id(),
            &ctx.task.id,
            SquadUpdate::summarizer(
                RoleBinding::new(summarizer.id.clone()).with_output(Value::String(summary.clone())),
            ),
        )?;
        ctx.summary = Some(summary);
        Ok(())
    }
}

struct ValidationStep;

#[async_trait]
impl PipelineStep<TaskRun> for ValidationStep {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let validator = manager.specialist(AgentRole::Validator).await?;
        let summary = ctx.summary.as_deref().unwrap_or_default();
        let input = prompts::validation_input(&validator, &ctx.task.instruction, summary);
        let (_, result) = manager.run_chain(&validator, input, ctx.cancel.clone()).await?;

        let judgement = match result {
            ChainResult::Judgement(judgement) => judgement,
            other => {
                return Err(OrchestrationError::Validation(format!(
                    "validator {} returned a {} instead of a judgement",
                    validator.id,
                    other.interaction_type().as_str()
                )));
            }
        };
        judgement.validate()?;
        info!(
            task = %ctx.task.id,
            satisfied = judgement.satisfied,
            score = judgement.score,
            "Judgement received"
        );

        manager.state_manager().update_task_squad(
            ctx.plan_id(),
            &ctx.task.id,
            SquadUpdate::validator(
                RoleBinding::new(validator.id.clone())
                    .with_output(serde_json::to_value(&judgement)?),
            ),
        )?;
        let interaction = Interaction::new(
            thread.id.clone(),
            Participant::agent(validator.id.clone()),
            ctx.executor_participant(),
            InteractionPayload::Judgement(judgement.clone()),
        )
        .with_status(InteractionStatus::Success);
        thread.append(interaction);
        ctx.judgement = Some(judgement);
        Ok(())
    }
}

struct FinalizationStep;

#[async_trait]
impl PipelineStep<TaskRun> for FinalizationStep {
    fn name(&self) -> &'static str {
        "finalize"
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
    ) -> Result<(), OrchestrationError> {
        let Some(judgement) = &ctx.judgement else {
            return Err(OrchestrationError::Validation(format!(
                "task {} reached finalization without a judgement",
                ctx.task.id
            )));
        };
        let summary = ctx.summary.clone().unwrap_or_default();
        let state = manager.state_manager();

        if judgement.satisfied {
            state.record_task_result(ctx.plan_id(), &ctx.task.id, Value::String(summary.clone()))?;
            if let Some(interaction) = thread.interaction_mut(&ctx.interaction_id) {
                if let InteractionPayload::Task(task) = &mut interaction.payload {
                    task.result = Some(Value::String(summary));
                }
                interaction.succeed();
            }
        } else {
            let reason = format!("Validator not satisfied: {}", judgement.feedback);
            let attempts = state.record_task_error(ctx.plan_id(), &ctx.task.id, reason.clone())?;
            debug!(task = %ctx.task.id, attempts, missing = ?judgement.analysis.missing, "Task needs another attempt");
            if let Some(interaction) = thread.interaction_mut(&ctx.interaction_id) {
                interaction.fail(InteractionError::new(ErrorCode::Validation, reason));
            }
        }
        Ok(())
    }
}

/// Counts the failed attempt (unless the task could not run at all) and
/// fails the TASK interaction.
struct TaskErrorStep;

#[async_trait]
impl RecoveryStep<TaskRun> for TaskErrorStep {
    async fn recover(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut TaskRun,
        error: &OrchestrationError,
    ) {
        let mut scope = ErrorScope::task();
        if let Some(agent) = &ctx.executor {
            scope = scope.with_chain(agent.chain_type);
        }
        let decision = manager.error_handler().classify(scope, error);

        if error.class() != ErrorClass::Dependency {
            if let Err(e) =
                manager
                    .state_manager()
                    .record_task_error(ctx.plan_id(), &ctx.task.id, error.to_string())
            {
                warn!(task = %ctx.task.id, "Could not record task error: {}", e);
            }
        }
        if let Some(interaction) = thread.interaction_mut(&ctx.interaction_id) {
            interaction.fail(decision.to_interaction_error());
        }
    }
}

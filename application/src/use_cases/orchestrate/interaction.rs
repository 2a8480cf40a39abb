//! Interaction result pipeline.
//!
//! Turns the initiating agent's [`ChainResult`] into an interaction on the
//! thread: validate, then exactly one of tool call / plan / judgement /
//! message, with failures recorded on the interaction before they are
//! returned.

use super::OrchestrationManager;
use super::pipeline::{Pipeline, PipelineStep, RecoveryStep};
use super::types::{ErrorScope, OrchestrationError};
use async_trait::async_trait;
use tracing::{debug, info};
use triad_domain::{
    Agent, ChainResult, Interaction, InteractionId, InteractionPayload, InteractionStatus,
    Message, Participant, Plan, PlanId, Thread,
};

pub(crate) struct InteractionRun {
    pub initiator: Agent,
    pub requester: Participant,
    pub result: ChainResult,
    /// Interaction produced for the result, once appended
    pub interaction_id: Option<InteractionId>,
    /// Materialized plan awaiting execution
    pub plan: Option<Plan>,
}

impl InteractionRun {
    pub fn new(initiator: Agent, requester: Participant, result: ChainResult) -> Self {
        Self {
            initiator,
            requester,
            result,
            interaction_id: None,
            plan: None,
        }
    }

    fn source(&self) -> Participant {
        Participant::agent(self.initiator.id.clone())
    }

    fn append(&mut self, thread: &mut Thread, payload: InteractionPayload, status: InteractionStatus) {
        let interaction = Interaction::new(thread.id.clone(), self.source(), self.requester.clone(), payload)
            .with_status(status);
        self.interaction_id = Some(thread.append(interaction));
    }
}

pub(crate) fn pipeline() -> Pipeline<InteractionRun> {
    Pipeline::new("interaction-result")
        .step(ValidateResultStep)
        .step(ToolCallStep)
        .step(PlanStep)
        .step(JudgementStep)
        .step(MessageStep)
        .recover_with(InteractionErrorStep)
}

struct ValidateResultStep;

#[async_trait]
impl PipelineStep<InteractionRun> for ValidateResultStep {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn execute(
        &self,
        _manager: &OrchestrationManager,
        _thread: &mut Thread,
        ctx: &mut InteractionRun,
    ) -> Result<(), OrchestrationError> {
        match &ctx.result {
            ChainResult::ToolCall(call) => call.validate()?,
            ChainResult::Plan(proposal) => proposal.validate()?,
            ChainResult::Judgement(judgement) => judgement.validate()?,
            ChainResult::Message(_) => {}
        }
        Ok(())
    }
}

struct ToolCallStep;

#[async_trait]
impl PipelineStep<InteractionRun> for ToolCallStep {
    fn name(&self) -> &'static str {
        "tool-call"
    }

    fn applies_to(&self, ctx: &InteractionRun) -> bool {
        matches!(ctx.result, ChainResult::ToolCall(_))
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut InteractionRun,
    ) -> Result<(), OrchestrationError> {
        let ChainResult::ToolCall(call) = &ctx.result else {
            return Ok(());
        };
        let mut call = call.clone();
        let executor = manager.resolve_tool(&ctx.initiator, &call.tool)?;
        debug!(tool = %call.tool, function = %call.function, "Executing tool call");
        let output = executor.execute(&call.function, &call.parameters).await?;
        call.result = Some(output);
        ctx.append(thread, InteractionPayload::ToolCall(call), InteractionStatus::Success);
        Ok(())
    }
}

struct PlanStep;

#[async_trait]
impl PipelineStep<InteractionRun> for PlanStep {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn applies_to(&self, ctx: &InteractionRun) -> bool {
        matches!(ctx.result, ChainResult::Plan(_))
    }

    async fn execute(
        &self,
        _manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut InteractionRun,
    ) -> Result<(), OrchestrationError> {
        let ChainResult::Plan(proposal) = &ctx.result else {
            return Ok(());
        };
        let plan = proposal.materialize(PlanId::generate(), &ctx.initiator.id)?;
        info!(plan = %plan.id, tasks = plan.tasks.len(), goal = %plan.goal, "Materialized plan");
        ctx.append(thread, InteractionPayload::Plan(plan.clone()), InteractionStatus::InProgress);
        ctx.plan = Some(plan);
        Ok(())
    }
}

struct JudgementStep;

#[async_trait]
impl PipelineStep<InteractionRun> for JudgementStep {
    fn name(&self) -> &'static str {
        "judgement"
    }

    fn applies_to(&self, ctx: &InteractionRun) -> bool {
        matches!(ctx.result, ChainResult::Judgement(_))
    }

    async fn execute(
        &self,
        _manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut InteractionRun,
    ) -> Result<(), OrchestrationError> {
        if let ChainResult::Judgement(judgement) = &ctx.result {
            let payload = InteractionPayload::Judgement(judgement.clone());
            ctx.append(thread, payload, InteractionStatus::Success);
        }
        Ok(())
    }
}

struct MessageStep;

#[async_trait]
impl PipelineStep<InteractionRun> for MessageStep {
    fn name(&self) -> &'static str {
        "message"
    }

    fn applies_to(&self, ctx: &InteractionRun) -> bool {
        matches!(ctx.result, ChainResult::Message(_))
    }

    async fn execute(
        &self,
        _manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut InteractionRun,
    ) -> Result<(), OrchestrationError> {
        if let ChainResult::Message(text) = &ctx.result {
            let payload = InteractionPayload::Message(Message::assistant(text.clone()));
            ctx.append(thread, payload, InteractionStatus::Success);
        }
        Ok(())
    }
}

/// Marks the interaction FAILED with the handler's error record. A result
/// that failed before it could be recorded is appended as a failed message
/// carrying its rendering.
struct InteractionErrorStep;

#[async_trait]
impl RecoveryStep<InteractionRun> for InteractionErrorStep {
    async fn recover(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut InteractionRun,
        error: &OrchestrationError,
    ) {
        let scope = ErrorScope::interaction(ctx.result.interaction_type())
            .with_chain(ctx.initiator.chain_type);
        let record = manager.error_handler().handle(scope, error).to_interaction_error();

        if ctx.interaction_id.is_none() {
            let payload = match &ctx.result {
                ChainResult::ToolCall(call) => InteractionPayload::ToolCall(call.clone()),
                ChainResult::Judgement(judgement) => InteractionPayload::Judgement(judgement.clone()),
                other => InteractionPayload::Message(Message::assistant(other.render())),
            };
            ctx.append(thread, payload, InteractionStatus::Pending);
        }
        if let Some(interaction) = ctx
            .interaction_id
            .as_ref()
            .and_then(|id| thread.interaction_mut(id))
        {
            interaction.fail(record);
        }
    }
}

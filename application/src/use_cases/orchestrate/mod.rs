//! Orchestration use case
//!
//! Drives a thread from one user request to a finished answer:
//!
//! | Stage | Pipeline | Runs |
//! |-------|----------|------|
//! | 1. Initiating chain | - | once per thread |
//! | 2. Interaction result | validate → tool call / plan / judgement / message | once per thread |
//! | 3. Plan execution | validation → initialization → task loop → summary | per plan (nested plans recurse) |
//! | 4. Task execution | readiness → chain → dispatch → summarize → validate → finalize | per task attempt, inside the task gate |
//!
//! All scheduling state lives in the injected
//! [`PlanExecutionStateManager`]; the manager itself only holds its ports
//! and the lazily created validator/summarizer agents shared by every task.

mod interaction;
mod pipeline;
mod plan;
mod prompts;
mod task;
pub mod types;

pub use types::{ErrorScope, OrchestrationError, PlanOutcome, TaskOutcome, TaskRequest};

use crate::config::OrchestrationParams;
use crate::ports::agent_registry::{AgentRegistry, RegistryError};
use crate::ports::chain_executor::ChainExecutor;
use crate::ports::status_sink::{NoStatus, StatusSink};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::error_handler::{ErrorDecision, ErrorHandler};
use crate::use_cases::state_manager::PlanExecutionStateManager;
use futures::future::BoxFuture;
use interaction::InteractionRun;
use pipeline::Pipeline;
use plan::PlanRun;
use std::sync::Arc;
use task::TaskRun;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use triad_domain::{
    Agent, AgentId, AgentRole, ChainExecutionResult, ChainInput, ChainResult, DomainError,
    Interaction, InteractionPayload, InteractionStatus, InteractionType, Message, Participant,
    Plan, Thread,
};

/// Entry point of the engine.
pub struct OrchestrationManager {
    chain_executor: Arc<dyn ChainExecutor>,
    registry: Arc<dyn AgentRegistry>,
    state: Arc<PlanExecutionStateManager>,
    error_handler: Arc<ErrorHandler>,
    status: Arc<dyn StatusSink>,
    validator: OnceCell<Agent>,
    summarizer: OnceCell<Agent>,
    interaction_pipeline: Pipeline<InteractionRun>,
    plan_pipeline: Pipeline<PlanRun>,
    task_pipeline: Pipeline<TaskRun>,
}

impl OrchestrationManager {
    pub fn new(
        chain_executor: Arc<dyn ChainExecutor>,
        registry: Arc<dyn AgentRegistry>,
        state: Arc<PlanExecutionStateManager>,
    ) -> Self {
        Self {
            chain_executor,
            registry,
            state,
            error_handler: Arc::new(ErrorHandler::new()),
            status: Arc::new(NoStatus),
            validator: OnceCell::new(),
            summarizer: OnceCell::new(),
            interaction_pipeline: interaction::pipeline(),
            plan_pipeline: plan::pipeline(),
            task_pipeline: task::pipeline(),
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn state_manager(&self) -> &Arc<PlanExecutionStateManager> {
        &self.state
    }

    pub fn params(&self) -> &OrchestrationParams {
        self.state.params()
    }

    pub(crate) fn registry(&self) -> &dyn AgentRegistry {
        self.registry.as_ref()
    }

    pub(crate) fn error_handler(&self) -> &ErrorHandler {
        &self.error_handler
    }

    pub(crate) fn status(&self) -> &dyn StatusSink {
        self.status.as_ref()
    }

    // ==================== Thread ====================

    /// Handle one user request on `thread`.
    ///
    /// The thread ends COMPLETED, or FAILED with the error string when any
    /// stage fails; the error is returned as well. A plan whose tasks failed
    /// still completes the thread with a best-effort summary.
    pub async fn orchestrate_thread(
        &self,
        thread: &mut Thread,
        content: &str,
        initiating_agent: &AgentId,
    ) -> Result<(), OrchestrationError> {
        info!(thread = %thread.id, agent = %initiating_agent, "Orchestrating thread");
        thread.activate();

        match self.run_thread(thread, content, initiating_agent).await {
            Ok(()) => {
                thread.complete();
                info!(thread = %thread.id, interactions = thread.len(), "Thread completed");
                Ok(())
            }
            Err(e) => {
                thread.fail(e.to_string());
                info!(thread = %thread.id, error = %e, "Thread failed");
                Err(e)
            }
        }
    }

    async fn run_thread(
        &self,
        thread: &mut Thread,
        content: &str,
        initiating_agent: &AgentId,
    ) -> Result<(), OrchestrationError> {
        let agent = self
            .registry
            .require_agent(initiating_agent)
            .map_err(|e| self.routed(ErrorScope::default(), e.into()))?;

        let request = Interaction::new(
            thread.id.clone(),
            Participant::User,
            Participant::agent(agent.id.clone()),
            InteractionPayload::Message(Message::user(content)),
        )
        .with_status(InteractionStatus::Success);
        thread.append(request);

        self.status.set_working_status(&format!("{} is thinking...", agent.name));
        let input = ChainInput::for_chain(agent.chain_type, content);
        let (_, result) = self
            .run_chain(&agent, input, CancellationToken::new())
            .await
            .map_err(|e| self.routed(ErrorScope::new(None, Some(agent.chain_type)), e))?;

        let mut run = InteractionRun::new(agent.clone(), Participant::User, result);
        self.interaction_pipeline.run(self, thread, &mut run).await?;

        if let Some(plan) = run.plan.take() {
            let outcome = self
                .execute_plan(thread, plan, Participant::User, &agent.id)
                .await;
            let plan_interaction = run.interaction_id.as_ref().and_then(|id| thread.interaction_mut(id));
            match outcome {
                Ok(outcome) => {
                    if let Some(interaction) = plan_interaction {
                        task::settle_plan_interaction(
                            interaction,
                            outcome.succeeded,
                            outcome.completed,
                            outcome.total,
                        );
                    }
                }
                Err(e) => {
                    let scope = ErrorScope::interaction(InteractionType::Plan);
                    let decision = self.error_handler.handle(scope, &e);
                    if let Some(interaction) = plan_interaction {
                        interaction.fail(decision.to_interaction_error());
                    }
                    return Err(e);
                }
            }
        } else if run.result.interaction_type() != InteractionType::Message {
            let echo = run
                .interaction_id
                .as_ref()
                .and_then(|id| thread.interaction(id))
                .map(Interaction::render);
            if let Some(text) = echo {
                let message = Interaction::new(
                    thread.id.clone(),
                    Participant::agent(agent.id.clone()),
                    Participant::User,
                    InteractionPayload::Message(Message::assistant(text)),
                )
                .with_status(InteractionStatus::Success);
                thread.append(message);
            }
        }
        Ok(())
    }

    // ==================== Plan ====================

    /// Execute a root plan (depth 0) and return its outcome.
    ///
    /// The plan's context stays registered with the state manager after the
    /// call; [`PlanExecutionStateManager::dispose`] releases it.
    pub async fn execute_plan(
        &self,
        thread: &mut Thread,
        plan: Plan,
        requester: Participant,
        initiator: &AgentId,
    ) -> Result<PlanOutcome, OrchestrationError> {
        self.execute_plan_at_depth(thread, plan, requester, initiator.clone(), 0)
            .await
    }

    /// Boxed so that task → plan → task recursion has a finite future type.
    pub(crate) fn execute_plan_at_depth<'a>(
        &'a self,
        thread: &'a mut Thread,
        plan: Plan,
        requester: Participant,
        initiator: AgentId,
        depth: usize,
    ) -> BoxFuture<'a, Result<PlanOutcome, OrchestrationError>> {
        Box::pin(async move {
            info!(plan = %plan.id, depth, goal = %plan.goal, "Executing plan");
            let mut run = PlanRun::new(plan, requester, initiator, depth);
            self.plan_pipeline.run(self, thread, &mut run).await?;
            run.into_outcome(self)
        })
    }

    // ==================== Task ====================

    /// Run one attempt of a task inside the task gate.
    ///
    /// A failed attempt is counted on the plan context exactly once, except
    /// when the task was not allowed to run at all.
    pub async fn execute_task(
        &self,
        thread: &mut Thread,
        request: TaskRequest,
    ) -> Result<TaskOutcome, OrchestrationError> {
        let plan = self.state.plan(&request.plan_id)?;
        let depth = self.state.depth(&request.plan_id)?;
        let task = plan
            .task(&request.task_id)
            .cloned()
            .ok_or_else(|| DomainError::TaskNotFound {
                plan: request.plan_id.to_string(),
                task: request.task_id.to_string(),
            })?;
        let plan_id = request.plan_id.clone();
        let task_id = task.id.clone();

        let record = Interaction::new(
            thread.id.clone(),
            request.assigned_by.clone(),
            Participant::agent(task.target_agent.clone()),
            InteractionPayload::Task(task.clone()),
        );
        let interaction_id = thread.append(record);
        let run = TaskRun::new(request, task, depth, interaction_id.clone());

        let attempt = {
            let thread = &mut *thread;
            self.state
                .execute_in_slot(&task_id, move |slot| async move {
                    let mut run = run;
                    run.cancel = slot.cancel_token();
                    run.slot = Some(slot);
                    self.task_pipeline.run(self, thread, &mut run).await?;
                    run.slot = None;
                    Ok(run)
                })
                .await
        };

        match attempt {
            Ok(run) => run.into_outcome(),
            Err(error @ OrchestrationError::Concurrency(_)) => {
                let decision = self.error_handler.classify(ErrorScope::task(), &error);
                self.state
                    .record_task_error(&plan_id, &task_id, error.to_string())?;
                if let Some(interaction) = thread.interaction_mut(&interaction_id) {
                    interaction.fail(decision.to_interaction_error());
                }
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    // ==================== Shared helpers ====================

    /// Run `agent`'s chain; a failed envelope becomes an error.
    pub(crate) async fn run_chain(
        &self,
        agent: &Agent,
        input: ChainInput,
        cancel: CancellationToken,
    ) -> Result<(ChainExecutionResult, ChainResult), OrchestrationError> {
        debug!(agent = %agent.id, chain = %agent.chain_id, "Running chain");
        let envelope = self
            .chain_executor
            .execute_chain(&agent.chain_id, input, cancel)
            .await?;
        match envelope.clone().into_result() {
            Ok(result) => Ok((envelope, result)),
            Err(message) => Err(OrchestrationError::ChainFailed {
                chain_id: agent.chain_id.clone(),
                message,
            }),
        }
    }

    /// Validator or summarizer shared by every task, created on first use.
    pub(crate) async fn specialist(&self, role: AgentRole) -> Result<Agent, OrchestrationError> {
        let cell = match role {
            AgentRole::Validator => &self.validator,
            AgentRole::Summarizer => &self.summarizer,
            AgentRole::Executor => {
                return Err(RegistryError::SpecialistUnavailable(role).into());
            }
        };
        let agent = cell
            .get_or_try_init(|| async {
                let agent = self.registry.create_specialised_agent(role).await?;
                debug!(role = %role, agent = %agent.id, "Created specialised agent");
                Ok::<_, RegistryError>(agent)
            })
            .await?;
        Ok(agent.clone())
    }

    /// Executor for `tool`, provided `agent` may call it.
    pub(crate) fn resolve_tool(
        &self,
        agent: &Agent,
        tool: &str,
    ) -> Result<Arc<dyn ToolExecutorPort>, OrchestrationError> {
        if !agent.has_tool(tool) {
            return Err(OrchestrationError::Validation(format!(
                "agent {} may not call tool {}",
                agent.id, tool
            )));
        }
        self.registry
            .tool_executor(tool)
            .ok_or_else(|| RegistryError::ToolNotFound(tool.to_string()).into())
    }

    fn routed(&self, scope: ErrorScope, error: OrchestrationError) -> OrchestrationError {
        let _: ErrorDecision = self.error_handler.handle(scope, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::chain_executor::ChainError;
    use crate::ports::tool_executor::ToolError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use triad_domain::{ChainType, ErrorCode, PlanId, TaskId, ThreadStatus};

    // ==================== Test Infrastructure ====================

    /// One scripted chain reply
    enum Scripted {
        /// Raw chain output, classified like an adapter would
        Output(Value),
        /// Failed execution envelope
        Fail(String),
        /// Never answers until cancelled
        Hang,
    }

    struct ScriptedChains {
        scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
        calls: Mutex<Vec<(String, ChainInput)>>,
    }

    impl ScriptedChains {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn script(self, chain_id: &str, steps: Vec<Scripted>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(chain_id.to_string(), steps.into());
            self
        }

        fn outputs(self, chain_id: &str, outputs: Vec<Value>) -> Self {
            self.script(chain_id, outputs.into_iter().map(Scripted::Output).collect())
        }

        fn inputs_for(&self, chain_id: &str) -> Vec<ChainInput> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == chain_id)
                .map(|(_, input)| input.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChainExecutor for ScriptedChains {
        async fn execute_chain(
            &self,
            chain_id: &str,
            input: ChainInput,
            cancel: CancellationToken,
        ) -> Result<ChainExecutionResult, ChainError> {
            self.calls
                .lock()
                .unwrap()
                .push((chain_id.to_string(), input));
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(chain_id)
                .and_then(|queue| queue.pop_front());

            match next {
                Some(Scripted::Output(value)) => {
                    let result = ChainResult::from_value(value)
                        .map_err(|e| ChainError::InvalidOutput(e.to_string()))?;
                    Ok(ChainExecutionResult::ok(result, Duration::from_millis(5)))
                }
                Some(Scripted::Fail(message)) => {
                    Ok(ChainExecutionResult::failed(message, Duration::from_millis(5)))
                }
                Some(Scripted::Hang) => {
                    cancel.cancelled().await;
                    Err(ChainError::Cancelled)
                }
                None => Err(ChainError::RequestFailed(format!(
                    "no scripted output left for {}",
                    chain_id
                ))),
            }
        }
    }

    struct SheetsTool;

    #[async_trait]
    impl ToolExecutorPort for SheetsTool {
        fn tool_id(&self) -> &str {
            "sheets"
        }

        async fn execute(&self, function: &str, _params: &Value) -> Result<Value, ToolError> {
            match function {
                "read" => Ok(json!({"rows": 3})),
                other => Err(ToolError::UnknownFunction {
                    tool: "sheets".to_string(),
                    function: other.to_string(),
                }),
            }
        }
    }

    struct MockRegistry {
        agents: HashMap<String, Agent>,
        specialist_requests: AtomicUsize,
    }

    impl MockRegistry {
        fn new() -> Self {
            let agents = [
                Agent::new("planner", "planner-chain", ChainType::TaskPlanning),
                Agent::new("exec", "exec-chain", ChainType::TaskExecution).with_tool("sheets"),
                Agent::new("validator", "judge-chain", ChainType::Judgement)
                    .with_role(AgentRole::Validator),
                Agent::new("summarizer", "summary-chain", ChainType::Conversation)
                    .with_role(AgentRole::Summarizer),
            ];
            Self {
                agents: agents
                    .into_iter()
                    .map(|a| (a.id.to_string(), a))
                    .collect(),
                specialist_requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AgentRegistry for MockRegistry {
        fn get_agent(&self, id: &AgentId) -> Option<Agent> {
            self.agents.get(id.as_str()).cloned()
        }

        fn tool_executor(&self, tool_id: &str) -> Option<Arc<dyn ToolExecutorPort>> {
            (tool_id == "sheets").then(|| Arc::new(SheetsTool) as Arc<dyn ToolExecutorPort>)
        }

        async fn create_specialised_agent(&self, role: AgentRole) -> Result<Agent, RegistryError> {
            self.specialist_requests.fetch_add(1, Ordering::SeqCst);
            self.agents
                .values()
                .find(|a| a.role == role)
                .cloned()
                .ok_or(RegistryError::SpecialistUnavailable(role))
        }
    }

    struct Harness {
        manager: OrchestrationManager,
        chains: Arc<ScriptedChains>,
        registry: Arc<MockRegistry>,
    }

    fn harness(chains: ScriptedChains, params: OrchestrationParams) -> Harness {
        let chains = Arc::new(chains);
        let registry = Arc::new(MockRegistry::new());
        let state = Arc::new(PlanExecutionStateManager::new(params));
        let manager = OrchestrationManager::new(chains.clone(), registry.clone(), state);
        Harness {
            manager,
            chains,
            registry,
        }
    }

    fn satisfied() -> Value {
        json!({"satisfied": true, "score": 90, "feedback": "complete"})
    }

    fn unsatisfied(missing: &[&str]) -> Value {
        json!({
            "satisfied": false,
            "score": 40,
            "feedback": "incomplete",
            "analysis": {"missing": missing}
        })
    }

    /// The only plan registered at `depth`
    fn plan_at_depth(manager: &OrchestrationManager, depth: usize) -> PlanId {
        let state = manager.state_manager();
        state
            .active_plans()
            .into_iter()
            .find(|id| state.depth(id).unwrap() == depth)
            .unwrap()
    }

    fn task_at_step(manager: &OrchestrationManager, plan_id: &PlanId, step: u32) -> TaskId {
        let plan = manager.state_manager().plan(plan_id).unwrap();
        plan.task_by_step(step).unwrap().id.clone()
    }

    fn status_of(manager: &OrchestrationManager, plan_id: &PlanId, step: u32) -> InteractionStatus {
        let task_id = task_at_step(manager, plan_id, step);
        manager
            .state_manager()
            .task_state(plan_id, &task_id)
            .unwrap()
            .unwrap()
            .status
    }

    fn last_message(thread: &Thread) -> String {
        thread
            .of_type(InteractionType::Message)
            .last()
            .and_then(|i| i.as_message())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    // ==================== Thread-level flows ====================

    #[tokio::test]
    async fn test_message_result_completes_thread() {
        let h = harness(
            ScriptedChains::new().outputs("planner-chain", vec![json!("Hello there")]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "hi", &AgentId::new("planner"))
            .await
            .unwrap();

        assert_eq!(thread.status, ThreadStatus::Completed);
        assert_eq!(thread.len(), 2);
        assert!(thread.interactions()[0].source.is_user());
        assert_eq!(last_message(&thread), "Hello there");

        let inputs = h.chains.inputs_for("planner-chain");
        assert_eq!(inputs[0].get_str("request"), Some("hi"));
    }

    #[tokio::test]
    async fn test_chain_failure_fails_thread() {
        let h = harness(
            ScriptedChains::new().script("planner-chain", vec![Scripted::Fail("model offline".into())]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        let result = h
            .manager
            .orchestrate_thread(&mut thread, "hi", &AgentId::new("planner"))
            .await;

        assert!(matches!(result, Err(OrchestrationError::ChainFailed { .. })));
        assert_eq!(thread.status, ThreadStatus::Failed);
        assert!(thread.error.as_deref().unwrap().contains("model offline"));
    }

    #[tokio::test]
    async fn test_unknown_initiator_fails_thread() {
        let h = harness(ScriptedChains::new(), OrchestrationParams::default());
        let mut thread = Thread::default();

        let result = h
            .manager
            .orchestrate_thread(&mut thread, "hi", &AgentId::new("ghost"))
            .await;

        assert!(matches!(
            result,
            Err(OrchestrationError::Registry(RegistryError::AgentNotFound(_)))
        ));
        assert_eq!(thread.status, ThreadStatus::Failed);
    }

    #[tokio::test]
    async fn test_tool_call_is_executed_and_echoed() {
        let h = harness(
            ScriptedChains::new().outputs(
                "exec-chain",
                vec![json!({"execution": {"tool": "sheets", "function": "read", "parameters": {"range": "A1:B9"}}})],
            ),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "read my sheet", &AgentId::new("exec"))
            .await
            .unwrap();

        let call = thread.of_type(InteractionType::ToolCall).next().unwrap();
        assert_eq!(call.status, InteractionStatus::Success);
        assert_eq!(call.as_tool_call().unwrap().result, Some(json!({"rows": 3})));
        assert!(last_message(&thread).contains("\"rows\": 3"));
    }

    #[tokio::test]
    async fn test_invalid_tool_call_marks_interaction_failed() {
        let h = harness(
            ScriptedChains::new().outputs(
                "exec-chain",
                vec![json!({"execution": {"tool": "", "function": "read"}})],
            ),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        let result = h
            .manager
            .orchestrate_thread(&mut thread, "read", &AgentId::new("exec"))
            .await;

        assert!(result.is_err());
        assert_eq!(thread.status, ThreadStatus::Failed);
        let failed = thread.last().unwrap();
        assert_eq!(failed.interaction_type(), InteractionType::ToolCall);
        assert_eq!(failed.status, InteractionStatus::Failed);
        assert_eq!(failed.error.as_ref().unwrap().code, ErrorCode::Validation);
    }

    // ==================== Plan flows ====================

    #[tokio::test]
    async fn test_plan_runs_tasks_in_order_and_summarizes() {
        let plan = json!({
            "goal": "Report spending",
            "tasks": [
                {"step": 1, "instruction": "Fetch transactions", "agent": "exec"},
                {"step": 2, "instruction": "Total them", "dependencies": [1], "agent": "exec"}
            ]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan])
                .outputs("exec-chain", vec![json!("3 rows"), json!("total 12")])
                .outputs("summary-chain", vec![json!("rows fetched"), json!("12 total"), json!("You spent 12")])
                .outputs("judge-chain", vec![satisfied(), satisfied()]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "How much did I spend?", &AgentId::new("planner"))
            .await
            .unwrap();

        assert_eq!(thread.status, ThreadStatus::Completed);
        assert_eq!(last_message(&thread), "You spent 12");

        let plan_id = plan_at_depth(&h.manager, 0);
        assert_eq!(status_of(&h.manager, &plan_id, 1), InteractionStatus::Success);
        assert_eq!(status_of(&h.manager, &plan_id, 2), InteractionStatus::Success);

        let plan_record = thread.of_type(InteractionType::Plan).next().unwrap();
        assert_eq!(plan_record.status, InteractionStatus::Success);
        assert_eq!(thread.of_type(InteractionType::Judgement).count(), 2);

        // Step 2 sees step 1's summarized output
        let second = h.chains.inputs_for("exec-chain")[1].get_str("task").unwrap().to_string();
        assert!(second.contains("rows fetched"));

        // Specialists are created once and shared
        assert_eq!(h.registry.specialist_requests.load(Ordering::SeqCst), 2);

        let squad = h
            .manager
            .state_manager()
            .task_squad(&plan_id, &task_at_step(&h.manager, &plan_id, 2))
            .unwrap()
            .unwrap();
        assert_eq!(squad.executor.output, Some(json!("total 12")));
        assert_eq!(squad.summarizer.unwrap().output, Some(json!("12 total")));
        assert!(squad.validator.is_some());
    }

    #[tokio::test]
    async fn test_missing_points_are_fed_back() {
        let plan = json!({
            "goal": "Report spending",
            "tasks": [{"step": 1, "instruction": "Total transactions", "agent": "exec"}]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan])
                .outputs("exec-chain", vec![json!("12"), json!("12 USD")])
                .outputs("summary-chain", vec![json!("twelve"), json!("twelve dollars"), json!("done")])
                .outputs("judge-chain", vec![unsatisfied(&["currency"]), satisfied()]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "total?", &AgentId::new("planner"))
            .await
            .unwrap();

        let inputs = h.chains.inputs_for("exec-chain");
        assert_eq!(inputs.len(), 2);
        assert!(!inputs[0].get_str("task").unwrap().contains("currency"));
        assert!(inputs[1].get_str("task").unwrap().contains("currency"));

        let summaries = h.chains.inputs_for("summary-chain");
        assert!(summaries[1].get_str("content").unwrap().contains("- currency"));

        let plan_id = plan_at_depth(&h.manager, 0);
        let task_id = task_at_step(&h.manager, &plan_id, 1);
        let state = h.manager.state_manager().task_state(&plan_id, &task_id).unwrap().unwrap();
        assert_eq!(state.status, InteractionStatus::Success);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.output, Some(json!("twelve dollars")));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_task_halts_plan_but_summary_is_produced() {
        let plan = json!({
            "goal": "Three steps",
            "tasks": [
                {"step": 1, "instruction": "One", "agent": "exec"},
                {"step": 2, "instruction": "Two", "agent": "exec"},
                {"step": 3, "instruction": "Three", "agent": "exec"}
            ]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan])
                .outputs("exec-chain", vec![json!("1"), json!("2"), json!("2"), json!("2")])
                .outputs(
                    "summary-chain",
                    vec![json!("s1"), json!("s2"), json!("s2"), json!("s2"), json!("partial answer")],
                )
                .outputs(
                    "judge-chain",
                    vec![satisfied(), unsatisfied(&["x"]), unsatisfied(&["x"]), unsatisfied(&["x"])],
                ),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "go", &AgentId::new("planner"))
            .await
            .unwrap();

        let plan_id = plan_at_depth(&h.manager, 0);
        let state = h.manager.state_manager();
        assert_eq!(status_of(&h.manager, &plan_id, 1), InteractionStatus::Success);
        assert_eq!(status_of(&h.manager, &plan_id, 2), InteractionStatus::Failed);
        assert_eq!(
            state.attempts(&plan_id, &task_at_step(&h.manager, &plan_id, 2)).unwrap(),
            3
        );
        // Step 3 never started
        assert_eq!(status_of(&h.manager, &plan_id, 3), InteractionStatus::Pending);
        assert_eq!(
            state.attempts(&plan_id, &task_at_step(&h.manager, &plan_id, 3)).unwrap(),
            0
        );

        assert_eq!(thread.status, ThreadStatus::Completed);
        assert_eq!(last_message(&thread), "partial answer");
        let plan_record = thread.of_type(InteractionType::Plan).next().unwrap();
        assert_eq!(plan_record.status, InteractionStatus::Failed);
        assert_eq!(plan_record.error.as_ref().unwrap().code, ErrorCode::TaskExecution);
    }

    #[tokio::test]
    async fn test_unmet_dependency_fails_task_without_running_it() {
        let plan = json!({
            "goal": "Out of order",
            "tasks": [
                {"step": 1, "instruction": "Total", "dependencies": [2], "agent": "exec"},
                {"step": 2, "instruction": "Fetch", "agent": "exec"}
            ]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan])
                .outputs("summary-chain", vec![json!("nothing done")]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "go", &AgentId::new("planner"))
            .await
            .unwrap();

        let plan_id = plan_at_depth(&h.manager, 0);
        let first = task_at_step(&h.manager, &plan_id, 1);
        let state = h.manager.state_manager().task_state(&plan_id, &first).unwrap().unwrap();
        assert_eq!(state.status, InteractionStatus::Failed);
        assert_eq!(state.attempts, 0);
        assert!(state.last_error.unwrap().contains("dependencies unmet"));
        assert_eq!(status_of(&h.manager, &plan_id, 2), InteractionStatus::Pending);

        assert!(h.chains.inputs_for("exec-chain").is_empty());
        assert_eq!(thread.of_type(InteractionType::Task).count(), 0);
        assert_eq!(last_message(&thread), "nothing done");
    }

    #[tokio::test]
    async fn test_nested_plan_summary_precedes_outer_success() {
        let outer = json!({
            "goal": "Research",
            "tasks": [{"step": 1, "instruction": "Break the research down"}]
        });
        let nested = json!({
            "goal": "Sub-research",
            "tasks": [{"step": 1, "instruction": "Look it up", "agent": "exec"}]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![outer, nested])
                .outputs("exec-chain", vec![json!("leaf")])
                .outputs(
                    "summary-chain",
                    vec![json!("leaf summary"), json!("nested summary"), json!("outer summary"), json!("final")],
                )
                .outputs("judge-chain", vec![satisfied(), satisfied()]),
            OrchestrationParams::default(),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "research", &AgentId::new("planner"))
            .await
            .unwrap();

        let root = plan_at_depth(&h.manager, 0);
        let child = plan_at_depth(&h.manager, 1);
        assert_eq!(status_of(&h.manager, &child, 1), InteractionStatus::Success);
        assert_eq!(status_of(&h.manager, &root, 1), InteractionStatus::Success);

        let outer_task = task_at_step(&h.manager, &root, 1);
        let state = h.manager.state_manager().task_state(&root, &outer_task).unwrap().unwrap();
        assert_eq!(state.output, Some(json!("outer summary")));

        let position_of_message = |text: &str| {
            thread
                .interactions()
                .iter()
                .position(|i| i.as_message().is_some_and(|m| m.content == text))
                .unwrap()
        };
        let nested_summary = position_of_message("nested summary");
        let outer_verdict = thread
            .interactions()
            .iter()
            .rposition(|i| i.interaction_type() == InteractionType::Judgement)
            .unwrap();
        assert!(nested_summary < outer_verdict);
        assert_eq!(thread.of_type(InteractionType::Plan).count(), 2);
        assert_eq!(last_message(&thread), "final");

        // The outer task's planner received its composed task input as a request
        let planner_inputs = h.chains.inputs_for("planner-chain");
        assert!(planner_inputs[1].get_str("request").unwrap().contains("Break the research down"));
    }

    #[tokio::test]
    async fn test_nested_plans_respect_depth_limit() {
        let plan = |goal: &str| {
            json!({"goal": goal, "tasks": [{"step": 1, "instruction": "Plan further"}]})
        };
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan("root"), plan("one"), plan("two")])
                .outputs(
                    "summary-chain",
                    vec![json!("depth one summary"), json!("outer task summary"), json!("root summary")],
                )
                .outputs("judge-chain", vec![satisfied()]),
            OrchestrationParams::default().with_max_plan_depth(1),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "go deep", &AgentId::new("planner"))
            .await
            .unwrap();

        let root = plan_at_depth(&h.manager, 0);
        let child = plan_at_depth(&h.manager, 1);
        assert_eq!(h.manager.state_manager().active_plans().len(), 2);
        assert_eq!(status_of(&h.manager, &child, 1), InteractionStatus::Failed);
        assert_eq!(status_of(&h.manager, &root, 1), InteractionStatus::Success);

        // The planner would only nest too deep again, so the child task gets one attempt
        let child_task = task_at_step(&h.manager, &child, 1);
        let state = h.manager.state_manager().task_state(&child, &child_task).unwrap().unwrap();
        assert_eq!(state.attempts, 1);
        assert!(state.last_error.unwrap().contains("nesting too deep"));
        assert_eq!(h.chains.inputs_for("planner-chain").len(), 3);

        let failed_tasks: Vec<&Interaction> = thread
            .of_type(InteractionType::Task)
            .filter(|i| i.status == InteractionStatus::Failed)
            .collect();
        assert_eq!(failed_tasks.len(), 1);
        assert_eq!(failed_tasks[0].error.as_ref().unwrap().code, ErrorCode::Validation);
        assert_eq!(last_message(&thread), "root summary");
    }

    /// Replies by chain and prompt rather than from a shared queue, so
    /// concurrent threads all receive the same script.
    struct ResearchChains {
        leaf_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainExecutor for ResearchChains {
        async fn execute_chain(
            &self,
            chain_id: &str,
            input: ChainInput,
            _cancel: CancellationToken,
        ) -> Result<ChainExecutionResult, ChainError> {
            let breaking_down = input
                .get_str("request")
                .is_some_and(|request| request.contains("Break the research down"));
            let value = match chain_id {
                "planner-chain" if breaking_down => json!({
                    "goal": "Sub-research",
                    "tasks": [{"step": 1, "instruction": "Look it up", "agent": "exec"}]
                }),
                "planner-chain" => json!({
                    "goal": "Research",
                    "tasks": [{"step": 1, "instruction": "Break the research down"}]
                }),
                "exec-chain" => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    self.leaf_calls.fetch_add(1, Ordering::SeqCst);
                    json!("leaf")
                }
                "judge-chain" => satisfied(),
                _ => json!("summary"),
            };
            let result = ChainResult::from_value(value)
                .map_err(|e| ChainError::InvalidOutput(e.to_string()))?;
            Ok(ChainExecutionResult::ok(result, Duration::from_millis(5)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_threads_with_nested_plans_share_the_gate() {
        let chains = Arc::new(ResearchChains {
            leaf_calls: AtomicUsize::new(0),
        });
        let state = Arc::new(PlanExecutionStateManager::new(OrchestrationParams::default()));
        let manager = OrchestrationManager::new(chains.clone(), Arc::new(MockRegistry::new()), state);
        let planner = AgentId::new("planner");
        let (mut first, mut second, mut third) = (Thread::default(), Thread::default(), Thread::default());

        // Each root task holds a slot when its nested plan starts, filling the gate
        let started = tokio::time::Instant::now();
        let (a, b, c) = futures::join!(
            manager.orchestrate_thread(&mut first, "research 1", &planner),
            manager.orchestrate_thread(&mut second, "research 2", &planner),
            manager.orchestrate_thread(&mut third, "research 3", &planner),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(chains.leaf_calls.load(Ordering::SeqCst), 3);
        for thread in [&first, &second, &third] {
            assert_eq!(thread.status, ThreadStatus::Completed);
            assert_eq!(last_message(thread), "summary");
            assert_eq!(thread.of_type(InteractionType::Plan).count(), 2);
            assert!(
                thread
                    .of_type(InteractionType::Plan)
                    .all(|i| i.status == InteractionStatus::Success)
            );
        }
        assert_eq!(manager.state_manager().active_plans().len(), 6);
        assert_eq!(manager.state_manager().available_slots(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_task_times_out() {
        let plan = json!({
            "goal": "Slow",
            "tasks": [{"step": 1, "instruction": "Never answers", "agent": "exec"}]
        });
        let h = harness(
            ScriptedChains::new()
                .outputs("planner-chain", vec![plan])
                .script("exec-chain", vec![Scripted::Hang])
                .outputs("summary-chain", vec![json!("timed out")]),
            OrchestrationParams::default()
                .with_task_timeout(Duration::from_secs(5))
                .with_max_task_attempts(1),
        );
        let mut thread = Thread::default();

        h.manager
            .orchestrate_thread(&mut thread, "go", &AgentId::new("planner"))
            .await
            .unwrap();

        let plan_id = plan_at_depth(&h.manager, 0);
        let task_id = task_at_step(&h.manager, &plan_id, 1);
        let state = h.manager.state_manager().task_state(&plan_id, &task_id).unwrap().unwrap();
        assert_eq!(state.status, InteractionStatus::Failed);
        assert_eq!(state.attempts, 1);

        let task_record = thread.of_type(InteractionType::Task).next().unwrap();
        assert_eq!(task_record.status, InteractionStatus::Failed);
        assert_eq!(task_record.error.as_ref().unwrap().code, ErrorCode::Concurrency);
        assert_eq!(h.manager.state_manager().available_slots(), 3);
    }

    #[tokio::test]
    async fn test_execute_plan_directly() {
        let h = harness(
            ScriptedChains::new()
                .outputs("exec-chain", vec![json!("done")])
                .outputs("summary-chain", vec![json!("done, briefly"), json!("all done")])
                .outputs("judge-chain", vec![satisfied()]),
            OrchestrationParams::default(),
        );
        let plan = Plan::new("plan-direct", "Direct", "")
            .with_task(triad_domain::Task::new("only", 1, "Do it", "exec"));
        let mut thread = Thread::default();

        let outcome = h
            .manager
            .execute_plan(&mut thread, plan, Participant::User, &AgentId::new("planner"))
            .await
            .unwrap();

        assert!(outcome.succeeded);
        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.summary, "all done");

        let plan_id = PlanId::new("plan-direct");
        assert!(h.manager.state_manager().dispose(&plan_id));
        assert!(h.manager.state_manager().active_plans().is_empty());
    }
}

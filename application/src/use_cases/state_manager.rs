//! Plan execution state manager
//!
//! Owns every live [`PlanExecutionContext`] keyed by plan id, and the
//! process-wide task gate: a semaphore that bounds how many task executions
//! are in flight across all plans, plus a wall-clock budget per execution.
//!
//! Context mutations are short synchronous critical sections behind a
//! `std::sync::Mutex`; the lock is never held across an `.await`.

use crate::config::OrchestrationParams;
use crate::use_cases::orchestrate::types::OrchestrationError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use triad_domain::{
    DomainError, Plan, PlanExecutionContext, PlanId, PlanReport, PreviousTask, SquadUpdate,
    TaskExecutionSquad, TaskId, TaskState,
};

pub struct PlanExecutionStateManager {
    params: OrchestrationParams,
    contexts: Mutex<HashMap<PlanId, PlanExecutionContext>>,
    gate: Arc<Semaphore>,
}

impl PlanExecutionStateManager {
    pub fn new(params: OrchestrationParams) -> Self {
        let gate = Arc::new(Semaphore::new(params.max_concurrent_tasks));
        Self {
            params,
            contexts: Mutex::new(HashMap::new()),
            gate,
        }
    }

    pub fn params(&self) -> &OrchestrationParams {
        &self.params
    }

    /// Free slots in the task gate.
    pub fn available_slots(&self) -> usize {
        self.gate.available_permits()
    }

    fn contexts(&self) -> MutexGuard<'_, HashMap<PlanId, PlanExecutionContext>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(
        &self,
        plan_id: &PlanId,
        f: impl FnOnce(&PlanExecutionContext) -> T,
    ) -> Result<T, OrchestrationError> {
        let contexts = self.contexts();
        let context = contexts
            .get(plan_id)
            .ok_or_else(|| OrchestrationError::PlanNotFound(plan_id.clone()))?;
        Ok(f(context))
    }

    fn update<T>(
        &self,
        plan_id: &PlanId,
        f: impl FnOnce(&mut PlanExecutionContext) -> Result<T, DomainError>,
    ) -> Result<T, OrchestrationError> {
        let mut contexts = self.contexts();
        let context = contexts
            .get_mut(plan_id)
            .ok_or_else(|| OrchestrationError::PlanNotFound(plan_id.clone()))?;
        Ok(f(context)?)
    }

    // ==================== Context lifecycle ====================

    /// Register a fresh context for `plan`. An existing context for the same
    /// plan id is replaced.
    pub fn create_context(&self, plan: Plan, depth: usize) -> Result<PlanId, OrchestrationError> {
        if depth > self.params.max_plan_depth {
            return Err(OrchestrationError::PlanDepthExceeded {
                depth,
                max: self.params.max_plan_depth,
            });
        }
        let plan_id = plan.id.clone();
        let tasks = plan.tasks.len();
        let previous = self
            .contexts()
            .insert(plan_id.clone(), PlanExecutionContext::new(plan, depth));
        if previous.is_some() {
            warn!(plan = %plan_id, "Replaced existing execution context");
        }
        debug!(plan = %plan_id, depth, tasks, "Created execution context");
        Ok(plan_id)
    }

    pub fn initialize_task_states(&self, plan_id: &PlanId) -> Result<(), OrchestrationError> {
        self.update(plan_id, |ctx| {
            ctx.initialize_task_states();
            Ok(())
        })
    }

    /// Drop the context of a finished plan. Returns whether one existed.
    pub fn dispose(&self, plan_id: &PlanId) -> bool {
        let removed = self.contexts().remove(plan_id).is_some();
        if removed {
            debug!(plan = %plan_id, "Disposed execution context");
        }
        removed
    }

    pub fn active_plans(&self) -> Vec<PlanId> {
        let mut plans: Vec<PlanId> = self.contexts().keys().cloned().collect();
        plans.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        plans
    }

    // ==================== Readiness ====================

    pub fn validate_dependencies(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
    ) -> Result<bool, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.validate_dependencies(task_id))
    }

    /// Dependencies satisfied and attempts below the configured maximum.
    pub fn is_task_ready(&self, plan_id: &PlanId, task_id: &TaskId) -> Result<bool, OrchestrationError> {
        let max = self.params.max_task_attempts;
        self.read(plan_id, |ctx| ctx.is_task_ready(task_id, max))
    }

    // ==================== Task gate ====================

    /// Run `work` inside the task gate.
    ///
    /// Waits for a free slot (FIFO), then drives the future produced by
    /// `work` under the task timeout. On expiry the token handed to `work`
    /// is cancelled, the future is dropped and a concurrency error is
    /// returned. The slot is released on every path.
    pub async fn execute_with_concurrency<T, F, Fut>(
        &self,
        task_id: &TaskId,
        work: F,
    ) -> Result<T, OrchestrationError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError>>,
    {
        self.execute_in_slot(task_id, |slot| {
            let fut = work(slot.cancel_token());
            async move {
                let _slot = slot;
                fut.await
            }
        })
        .await
    }

    /// Like [`execute_with_concurrency`](Self::execute_with_concurrency), but
    /// `work` owns its [`TaskSlot`] and may hand the slot back while it waits
    /// on work that needs slots of its own.
    pub async fn execute_in_slot<T, F, Fut>(
        &self,
        task_id: &TaskId,
        work: F,
    ) -> Result<T, OrchestrationError>
    where
        F: FnOnce(TaskSlot) -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError>>,
    {
        let permit = Arc::clone(&self.gate).acquire_owned().await.map_err(|_| {
            OrchestrationError::Concurrency(format!("task gate closed before {} could run", task_id))
        })?;
        debug!(
            task = %task_id,
            free = self.gate.available_permits(),
            "Acquired task slot"
        );

        let cancel = CancellationToken::new();
        let slot = TaskSlot {
            task_id: task_id.clone(),
            gate: Arc::clone(&self.gate),
            permit: Some(permit),
            cancel: cancel.clone(),
        };
        let timeout = self.params.task_timeout;
        match tokio::time::timeout(timeout, work(slot)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                warn!(task = %task_id, timeout_secs = timeout.as_secs_f64(), "Task timed out");
                Err(OrchestrationError::Concurrency(format!(
                    "task {} exceeded its {:?} budget",
                    task_id, timeout
                )))
            }
        }
    }

    // ==================== Task state transitions ====================

    pub fn mark_in_progress(&self, plan_id: &PlanId, task_id: &TaskId) -> Result<(), OrchestrationError> {
        self.update(plan_id, |ctx| ctx.mark_in_progress(task_id))
    }

    pub fn mark_failed(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
        reason: Option<String>,
    ) -> Result<(), OrchestrationError> {
        self.update(plan_id, |ctx| ctx.mark_failed(task_id, reason))
    }

    pub fn record_task_result(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
        output: serde_json::Value,
    ) -> Result<(), OrchestrationError> {
        self.update(plan_id, |ctx| ctx.record_result(task_id, output))?;
        info!(plan = %plan_id, task = %task_id, "Task succeeded");
        Ok(())
    }

    /// Count a failed attempt; returns the attempt count so far.
    pub fn record_task_error(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
        error: impl Into<String>,
    ) -> Result<u32, OrchestrationError> {
        let error = error.into();
        let attempts = self.update(plan_id, |ctx| ctx.record_error(task_id, error.as_str()))?;
        debug!(plan = %plan_id, task = %task_id, attempts, "Recorded task error: {}", error);
        Ok(attempts)
    }

    pub fn update_task_squad(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
        update: SquadUpdate,
    ) -> Result<(), OrchestrationError> {
        self.update(plan_id, |ctx| ctx.update_squad(task_id, update))
    }

    // ==================== Queries ====================

    /// Cloned snapshot of the whole context.
    pub fn context(&self, plan_id: &PlanId) -> Result<PlanExecutionContext, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.clone())
    }

    pub fn plan(&self, plan_id: &PlanId) -> Result<Plan, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.plan.clone())
    }

    pub fn depth(&self, plan_id: &PlanId) -> Result<usize, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.depth)
    }

    pub fn task_state(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
    ) -> Result<Option<TaskState>, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.task_state(task_id).cloned())
    }

    pub fn task_squad(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
    ) -> Result<Option<TaskExecutionSquad>, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.squad(task_id).cloned())
    }

    pub fn attempts(&self, plan_id: &PlanId, task_id: &TaskId) -> Result<u32, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.attempts(task_id))
    }

    pub fn previous_tasks(
        &self,
        plan_id: &PlanId,
        task_id: &TaskId,
    ) -> Result<Vec<PreviousTask>, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.previous_tasks(task_id))
    }

    pub fn report(&self, plan_id: &PlanId) -> Result<PlanReport, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.report())
    }

    pub fn has_failures(&self, plan_id: &PlanId) -> Result<bool, OrchestrationError> {
        self.read(plan_id, |ctx| ctx.has_failures())
    }

    // ==================== Persistence ====================

    /// Snapshot a context as JSON.
    pub fn serialize_context(&self, plan_id: &PlanId) -> Result<String, OrchestrationError> {
        let snapshot = self.read(plan_id, |ctx| serde_json::to_string(ctx))??;
        Ok(snapshot)
    }

    /// Re-register a context from a [`serialize_context`](Self::serialize_context)
    /// snapshot, replacing any live context with the same plan id.
    pub fn restore_context(&self, json: &str) -> Result<PlanId, OrchestrationError> {
        let context: PlanExecutionContext = serde_json::from_str(json)?;
        let plan_id = context.plan_id().clone();
        self.contexts().insert(plan_id.clone(), context);
        debug!(plan = %plan_id, "Restored execution context");
        Ok(plan_id)
    }
}

/// A held place in the task gate.
///
/// Dropping the slot frees the place. The task timeout keeps running while
/// the slot is handed back.
pub struct TaskSlot {
    task_id: TaskId,
    gate: Arc<Semaphore>,
    permit: Option<OwnedSemaphorePermit>,
    cancel: CancellationToken,
}

impl TaskSlot {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_held(&self) -> bool {
        self.permit.is_some()
    }

    /// Give the place back while `work` runs, then queue for it again.
    ///
    /// Tasks of a nested plan draw on the same gate as their parent, so the
    /// parent must not sit on its place while it waits for them.
    pub async fn released_while<T>(
        &mut self,
        work: impl Future<Output = T>,
    ) -> Result<T, OrchestrationError> {
        drop(self.permit.take());
        debug!(task = %self.task_id, "Released task slot");
        let output = work.await;

        let permit = Arc::clone(&self.gate).acquire_owned().await.map_err(|_| {
            OrchestrationError::Concurrency(format!(
                "task gate closed before {} could resume",
                self.task_id
            ))
        })?;
        debug!(task = %self.task_id, "Reacquired task slot");
        self.permit = Some(permit);
        Ok(output)
    }
}

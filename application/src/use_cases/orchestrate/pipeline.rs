//! Ordered step pipelines.
//!
//! A [`Pipeline`] runs its steps in order against one run context. Each
//! step declares whether it applies to the context; steps that do not
//! apply are skipped. The first failing step stops the pipeline, after
//! which the optional recovery step sees the error before it is returned.

use super::OrchestrationManager;
use super::types::OrchestrationError;
use async_trait::async_trait;
use tracing::{debug, trace};
use triad_domain::Thread;

#[async_trait]
pub(crate) trait PipelineStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, _ctx: &C) -> bool {
        true
    }

    async fn execute(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut C,
    ) -> Result<(), OrchestrationError>;
}

/// Runs once when a step fails, before the error leaves the pipeline.
#[async_trait]
pub(crate) trait RecoveryStep<C: Send>: Send + Sync {
    async fn recover(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut C,
        error: &OrchestrationError,
    );
}

pub(crate) struct Pipeline<C: Send> {
    name: &'static str,
    steps: Vec<Box<dyn PipelineStep<C>>>,
    recovery: Option<Box<dyn RecoveryStep<C>>>,
}

impl<C: Send> Pipeline<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            recovery: None,
        }
    }

    pub fn step(mut self, step: impl PipelineStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn recover_with(mut self, recovery: impl RecoveryStep<C> + 'static) -> Self {
        self.recovery = Some(Box::new(recovery));
        self
    }

    pub async fn run(
        &self,
        manager: &OrchestrationManager,
        thread: &mut Thread,
        ctx: &mut C,
    ) -> Result<(), OrchestrationError> {
        for step in &self.steps {
            if !step.applies_to(ctx) {
                trace!(pipeline = self.name, step = step.name(), "Skipped");
                continue;
            }
            debug!(pipeline = self.name, step = step.name(), "Running step");
            if let Err(e) = step.execute(manager, thread, ctx).await {
                debug!(pipeline = self.name, step = step.name(), error = %e, "Step failed");
                if let Some(recovery) = &self.recovery {
                    recovery.recover(manager, thread, ctx, &e).await;
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

use super::script::ReplayScript;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use triad_application::{ChainError, ChainExecutor};
use triad_domain::{ChainExecutionResult, ChainInput, ChainResult};

/// Chain executor that replays scripted outputs in order
pub struct ReplayChainExecutor {
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, ChainInput)>>,
}

impl ReplayChainExecutor {
    pub fn new(script: &ReplayScript) -> Self {
        let queues = script
            .chains
            .iter()
            .map(|(id, outputs)| (id.clone(), outputs.iter().cloned().collect()))
            .collect();
        Self {
            queues: Mutex::new(queues),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outputs not yet consumed, per chain
    pub fn remaining(&self) -> HashMap<String, usize> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, queue)| (id.clone(), queue.len()))
            .collect()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<(String, ChainInput)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_output(&self, chain_id: &str) -> Result<Value, ChainError> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = queues
            .get_mut(chain_id)
            .ok_or_else(|| ChainError::NotFound(chain_id.to_string()))?;
        queue.pop_front().ok_or_else(|| {
            ChainError::RequestFailed(format!("replay script for {} is exhausted", chain_id))
        })
    }
}

fn replayed_failure(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("error").and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl ChainExecutor for ReplayChainExecutor {
    async fn execute_chain(
        &self,
        chain_id: &str,
        input: ChainInput,
        cancel: CancellationToken,
    ) -> Result<ChainExecutionResult, ChainError> {
        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled);
        }
        let started = Instant::now();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chain_id.to_string(), input));

        let raw = self.next_output(chain_id)?;
        debug!(chain = chain_id, "Replaying chain output");

        if let Some(message) = replayed_failure(&raw) {
            return Ok(ChainExecutionResult::failed(message, started.elapsed()));
        }
        let result = ChainResult::from_value(raw).map_err(|e| ChainError::InvalidOutput(e.to_string()))?;
        Ok(ChainExecutionResult::ok(result, started.elapsed()))
    }
}

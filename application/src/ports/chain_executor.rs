//! Chain Executor port
//!
//! Defines the interface for running a chain (an LLM call that turns
//! structured input into a classified [`ChainResult`](triad_domain::ChainResult)).

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use triad_domain::{ChainExecutionResult, ChainInput};

/// Errors that can occur while running a chain
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Chain not found: {0}")]
    NotFound(String),

    #[error("Chain misconfigured: {0}")]
    Misconfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid chain output: {0}")]
    InvalidOutput(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ChainError {
    /// Configuration problems are not fixed by retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ChainError::NotFound(_) | ChainError::Misconfigured(_))
    }
}

/// Port for chain execution
///
/// Implementations (adapters) live in the infrastructure layer. The
/// cancellation token is cancelled when the caller abandons the call (for
/// example on a task timeout); implementations should stop work promptly.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    async fn execute_chain(
        &self,
        chain_id: &str,
        input: ChainInput,
        cancel: CancellationToken,
    ) -> Result<ChainExecutionResult, ChainError>;
}

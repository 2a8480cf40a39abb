//! Agent Registry port
//!
//! Looks up agents and their tool executors, and creates the specialised
//! validator/summarizer agents the task pipeline needs.

use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use triad_domain::{Agent, AgentId, AgentRole};

#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Tool not registered: {0}")]
    ToolNotFound(String),

    #[error("No {0} agent available")]
    SpecialistUnavailable(AgentRole),
}

#[async_trait]
pub trait AgentRegistry: Send + Sync {
    fn get_agent(&self, id: &AgentId) -> Option<Agent>;

    fn tool_executor(&self, tool_id: &str) -> Option<Arc<dyn ToolExecutorPort>>;

    /// Create (or hand out) an agent for a specialised role.
    async fn create_specialised_agent(&self, role: AgentRole) -> Result<Agent, RegistryError>;

    fn require_agent(&self, id: &AgentId) -> Result<Agent, RegistryError> {
        self.get_agent(id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.clone()))
    }
}

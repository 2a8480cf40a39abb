//! Agent Registry
//!
//! The [`InMemoryAgentRegistry`] implements [`AgentRegistry`] over agents
//! and tool executors registered by id, usually built from the
//! `[[agents]]` and `[specialists]` config sections.
//!
//! # Specialist resolution
//!
//! [`create_specialised_agent`](AgentRegistry::create_specialised_agent)
//! looks for, in order:
//!
//! 1. the agent named in `[specialists]` for that role
//! 2. the first registered agent (by id) with that role
//! 3. a built-in `validator` (judgement chain) or `summarizer`
//!    (conversation chain) agent

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use triad_application::{AgentRegistry, RegistryError, ToolExecutorPort};
use triad_domain::{Agent, AgentId, AgentRole, ChainType};

use crate::config::{ConfigValidationError, FileConfig};

/// Registry of agents and tool executors held in memory
pub struct InMemoryAgentRegistry {
    agents: BTreeMap<AgentId, Agent>,
    tools: HashMap<String, Arc<dyn ToolExecutorPort>>,
    specialists: HashMap<AgentRole, AgentId>,
}

impl InMemoryAgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            tools: HashMap::new(),
            specialists: HashMap::new(),
        }
    }

    /// Build from the agent and specialist sections of `config`.
    pub fn from_config(config: &FileConfig) -> Result<Self, ConfigValidationError> {
        let mut registry = Self::new();
        for agent in &config.agents {
            registry = registry.register(agent.to_agent()?);
        }
        for role in [AgentRole::Validator, AgentRole::Summarizer] {
            if let Some(id) = config.specialists.for_role(role) {
                registry = registry.with_specialist(role, id);
            }
        }
        Ok(registry)
    }

    pub fn register(mut self, agent: Agent) -> Self {
        debug!(agent = %agent.id, chain = %agent.chain_id, role = %agent.role, "Registered agent");
        self.agents.insert(agent.id.clone(), agent);
        self
    }

    /// Register a tool executor under its own `tool_id()`
    pub fn register_tool(mut self, executor: Arc<dyn ToolExecutorPort>) -> Self {
        debug!(tool = executor.tool_id(), "Registered tool");
        self.tools.insert(executor.tool_id().to_string(), executor);
        self
    }

    pub fn with_specialist(mut self, role: AgentRole, agent: impl Into<AgentId>) -> Self {
        self.specialists.insert(role, agent.into());
        self
    }

    pub fn agent_ids(&self) -> Vec<&AgentId> {
        self.agents.keys().collect()
    }

    pub fn tool_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn builtin_specialist(role: AgentRole) -> Option<Agent> {
        match role {
            AgentRole::Validator => Some(
                Agent::new("validator", "validator", ChainType::Judgement)
                    .with_name("Validator")
                    .with_role(AgentRole::Validator),
            ),
            AgentRole::Summarizer => Some(
                Agent::new("summarizer", "summarizer", ChainType::Conversation)
                    .with_name("Summarizer")
                    .with_role(AgentRole::Summarizer),
            ),
            AgentRole::Executor => None,
        }
    }
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    fn get_agent(&self, id: &AgentId) -> Option<Agent> {
        self.agents.get(id).cloned()
    }

    fn tool_executor(&self, tool_id: &str) -> Option<Arc<dyn ToolExecutorPort>> {
        self.tools.get(tool_id).cloned()
    }

    async fn create_specialised_agent(&self, role: AgentRole) -> Result<Agent, RegistryError> {
        if !role.is_specialised() {
            return Err(RegistryError::SpecialistUnavailable(role));
        }
        if let Some(id) = self.specialists.get(&role) {
            return self.require_agent(id);
        }
        self.agents
            .values()
            .find(|agent| agent.role == role)
            .cloned()
            .or_else(|| Self::builtin_specialist(role))
            .ok_or(RegistryError::SpecialistUnavailable(role))
    }
}

//! Agent domain entities

use super::value_objects::{AgentId, AgentRole};
use crate::chain::value_objects::ChainType;
use serde::{Deserialize, Serialize};

/// A registered agent: a named binding of a chain to a role and a set of tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Chain executed on behalf of this agent
    pub chain_id: String,
    /// Determines how chain input is shaped
    pub chain_type: ChainType,
    /// Tool (connector) ids this agent may invoke
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub role: AgentRole,
}

impl Agent {
    pub fn new(
        id: impl Into<AgentId>,
        chain_id: impl Into<String>,
        chain_type: ChainType,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            chain_id: chain_id.into(),
            chain_type,
            tools: Vec::new(),
            role: AgentRole::Executor,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = role;
        self
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_builder() {
        let agent = Agent::new("sheets", "sheets-chain", ChainType::TaskExecution)
            .with_name("Sheets Agent")
            .with_tool("sheets");

        assert_eq!(agent.id.as_str(), "sheets");
        assert_eq!(agent.name, "Sheets Agent");
        assert!(agent.has_tool("sheets"));
        assert!(!agent.has_tool("drive"));
        assert_eq!(agent.role, AgentRole::Executor);
    }

    #[test]
    fn test_agent_deserialize_defaults() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "judge",
            "name": "Judge",
            "chain_id": "judge-chain",
            "chain_type": "judgement"
        }))
        .unwrap();
        assert!(agent.tools.is_empty());
        assert_eq!(agent.role, AgentRole::Executor);
        assert_eq!(agent.chain_type, ChainType::Judgement);
    }
}

//! Agent configuration from TOML (`[[agents]]` and `[specialists]`)

use serde::{Deserialize, Serialize};
use triad_domain::{Agent, AgentRole, ChainType};

/// One registered agent
///
/// # Example
///
/// ```toml
/// [[agents]]
/// id = "planner"
/// name = "Planner"
/// chain_id = "planner-chain"
/// chain_type = "task_planning"   # conversation, task_planning, task_execution, judgement
/// tools = ["sheets"]
/// role = "executor"              # executor, validator, summarizer
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAgentConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub chain_id: String,
    #[serde(default = "default_chain_type")]
    pub chain_type: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_chain_type() -> String {
    ChainType::default().as_str().to_string()
}

fn default_role() -> String {
    AgentRole::default().as_str().to_string()
}

impl FileAgentConfig {
    pub fn new(id: impl Into<String>, chain_id: impl Into<String>, chain_type: ChainType) -> Self {
        Self {
            id: id.into(),
            name: None,
            chain_id: chain_id.into(),
            chain_type: chain_type.as_str().to_string(),
            tools: Vec::new(),
            role: default_role(),
        }
    }

    /// Build the domain agent. Fails on an unknown chain type or role.
    pub fn to_agent(&self) -> Result<Agent, super::ConfigValidationError> {
        let chain_type: ChainType = self.chain_type.parse().map_err(|_| {
            super::ConfigValidationError::InvalidEnumValue {
                field: format!("agents.{}.chain_type", self.id),
                value: self.chain_type.clone(),
            }
        })?;
        let role: AgentRole = self.role.parse().map_err(|_| {
            super::ConfigValidationError::InvalidEnumValue {
                field: format!("agents.{}.role", self.id),
                value: self.role.clone(),
            }
        })?;

        let mut agent = Agent::new(self.id.as_str(), self.chain_id.as_str(), chain_type).with_role(role);
        if let Some(name) = &self.name {
            agent = agent.with_name(name.as_str());
        }
        for tool in &self.tools {
            agent = agent.with_tool(tool.as_str());
        }
        Ok(agent)
    }
}

/// Agent ids used for the shared validator and summarizer
///
/// When unset, the registry falls back to built-in `validator` /
/// `summarizer` agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSpecialistsConfig {
    pub validator: Option<String>,
    pub summarizer: Option<String>,
}

impl FileSpecialistsConfig {
    pub fn for_role(&self, role: AgentRole) -> Option<&str> {
        match role {
            AgentRole::Validator => self.validator.as_deref(),
            AgentRole::Summarizer => self.summarizer.as_deref(),
            AgentRole::Executor => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_agent() {
        let toml_str = r#"
[[agents]]
id = "exec"
name = "Executor"
chain_id = "exec-chain"
chain_type = "task-execution"
tools = ["sheets", "drive"]
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let agent = config.agents[0].to_agent().unwrap();
        assert_eq!(agent.name, "Executor");
        assert_eq!(agent.chain_type, ChainType::TaskExecution);
        assert_eq!(agent.role, AgentRole::Executor);
        assert!(agent.has_tool("drive"));
    }

    #[test]
    fn test_unknown_chain_type() {
        let mut config = FileAgentConfig::new("x", "x-chain", ChainType::Conversation);
        config.chain_type = "poetry".to_string();
        assert!(config.to_agent().is_err());
    }

    #[test]
    fn test_specialists_for_role() {
        let specialists = FileSpecialistsConfig {
            validator: Some("judge".to_string()),
            summarizer: None,
        };
        assert_eq!(specialists.for_role(AgentRole::Validator), Some("judge"));
        assert_eq!(specialists.for_role(AgentRole::Summarizer), None);
        assert_eq!(specialists.for_role(AgentRole::Executor), None);
    }
}

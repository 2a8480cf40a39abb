//! Agent value objects.

use serde::{Deserialize, Serialize};

/// Identifier of a registered agent.
///
/// Agent ids are assigned by configuration (e.g. `"planner"`, `"sheets-agent"`),
/// so unlike plan and task ids they are not generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for AgentId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role an agent plays inside a task's squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Runs the task instruction itself
    #[default]
    Executor,
    /// Judges whether a task result fulfils its instruction
    Validator,
    /// Condenses raw task output into a concise answer
    Summarizer,
}

impl AgentRole {
    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Executor => "executor",
            AgentRole::Validator => "validator",
            AgentRole::Summarizer => "summarizer",
        }
    }

    /// Whether agents of this role are created on demand by the registry.
    pub fn is_specialised(&self) -> bool {
        !matches!(self, AgentRole::Executor)
    }
}

impl std::str::FromStr for AgentRole {
    type Err = crate::core::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "executor" => Ok(AgentRole::Executor),
            "validator" => Ok(AgentRole::Validator),
            "summarizer" | "summariser" => Ok(AgentRole::Summarizer),
            _ => Err(crate::core::error::DomainError::UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

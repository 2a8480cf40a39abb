//! Chain types and the chain-input strategy.
//!
//! Each chain type expects its input under a different key:
//!
//! | Chain type | Input shape |
//! |------------|-------------|
//! | `conversation` | `{content}` |
//! | `task_planning` | `{request}` |
//! | `task_execution` | `{task}` |
//! | `judgement` | `{requirement, response}` |

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    #[default]
    Conversation,
    TaskPlanning,
    TaskExecution,
    Judgement,
}

impl ChainType {
    pub fn as_str(&self) -> &str {
        match self {
            ChainType::Conversation => "conversation",
            ChainType::TaskPlanning => "task_planning",
            ChainType::TaskExecution => "task_execution",
            ChainType::Judgement => "judgement",
        }
    }
}

impl std::str::FromStr for ChainType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "conversation" => Ok(ChainType::Conversation),
            "task_planning" | "planning" => Ok(ChainType::TaskPlanning),
            "task_execution" | "execution" => Ok(ChainType::TaskExecution),
            "judgement" | "judgment" => Ok(ChainType::Judgement),
            _ => Err(DomainError::UnknownChainType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ChainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input map passed to a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainInput(serde_json::Map<String, serde_json::Value>);

impl ChainInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape `content` according to the strategy for `chain_type`.
    pub fn for_chain(chain_type: ChainType, content: &str) -> Self {
        match chain_type {
            ChainType::Conversation => Self::new().with("content", content),
            ChainType::TaskPlanning => Self::new().with("request", content),
            ChainType::TaskExecution => Self::new().with("task", content),
            ChainType::Judgement => {
                let (requirement, response) = split_requirement(content);
                Self::judgement(requirement, response)
            }
        }
    }

    pub fn judgement(requirement: impl Into<String>, response: impl Into<String>) -> Self {
        let requirement: String = requirement.into();
        let response: String = response.into();
        Self::new()
            .with("requirement", requirement)
            .with("response", response)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::Object(self.0)
    }
}

/// Split judgement text into `(requirement, response)` at the first `\n`
/// or `?`. A `?` stays with the requirement. Without either separator the
/// whole text is treated as the response.
pub fn split_requirement(content: &str) -> (String, String) {
    match content.char_indices().find(|(_, c)| *c == '\n' || *c == '?') {
        Some((index, '?')) => (
            content[..=index].trim().to_string(),
            content[index + 1..].trim().to_string(),
        ),
        Some((index, _)) => (
            content[..index].trim().to_string(),
            content[index + 1..].trim().to_string(),
        ),
        None => (String::new(), content.trim().to_string()),
    }
}

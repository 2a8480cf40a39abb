//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Enum-like fields stay strings here and are parsed into domain types
//! when the registry is built, so a typo is reported with its field path.

mod agent;
mod logging;
mod orchestration;
mod output;

pub use agent::{FileAgentConfig, FileSpecialistsConfig};
pub use logging::FileLoggingConfig;
pub use orchestration::FileOrchestrationConfig;
pub use output::{FileOutputConfig, FileOutputFormat};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use triad_application::OrchestrationParams;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("orchestration.{0} cannot be 0")]
    ZeroLimit(&'static str),

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("agent id cannot be empty")]
    EmptyAgentId,

    #[error("agent {0} has no chain_id")]
    MissingChain(String),

    #[error("{field}: unknown value '{value}'")]
    InvalidEnumValue { field: String, value: String },

    #[error("specialists.{role} refers to unknown agent {agent}")]
    UnknownSpecialist { role: &'static str, agent: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Scheduler limits
    pub orchestration: FileOrchestrationConfig,
    /// Registered agents
    pub agents: Vec<FileAgentConfig>,
    /// Shared validator / summarizer selection
    pub specialists: FileSpecialistsConfig,
    pub logging: FileLoggingConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let limits = &self.orchestration;
        if limits.max_concurrent_tasks == 0 {
            return Err(ConfigValidationError::ZeroLimit("max_concurrent_tasks"));
        }
        if limits.task_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroLimit("task_timeout_secs"));
        }
        if limits.max_task_attempts == 0 {
            return Err(ConfigValidationError::ZeroLimit("max_task_attempts"));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                return Err(ConfigValidationError::EmptyAgentId);
            }
            if agent.chain_id.trim().is_empty() {
                return Err(ConfigValidationError::MissingChain(agent.id.clone()));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigValidationError::DuplicateAgent(agent.id.clone()));
            }
            agent.to_agent()?;
        }

        let specialists = [
            ("validator", &self.specialists.validator),
            ("summarizer", &self.specialists.summarizer),
        ];
        for (role, id) in specialists {
            if let Some(id) = id
                && !seen.contains(id.as_str())
            {
                return Err(ConfigValidationError::UnknownSpecialist {
                    role,
                    agent: id.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn orchestration_params(&self) -> OrchestrationParams {
        self.orchestration.to_params()
    }
}

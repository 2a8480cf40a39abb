//! Orchestration limits from TOML (`[orchestration]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use triad_application::OrchestrationParams;

/// Raw scheduler limits
///
/// # Example
///
/// ```toml
/// [orchestration]
/// max_concurrent_tasks = 3
/// task_timeout_secs = 120
/// max_task_attempts = 3
/// max_plan_depth = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    pub max_concurrent_tasks: usize,
    pub task_timeout_secs: u64,
    pub max_task_attempts: u32,
    pub max_plan_depth: usize,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        let params = OrchestrationParams::default();
        Self {
            max_concurrent_tasks: params.max_concurrent_tasks,
            task_timeout_secs: params.task_timeout.as_secs(),
            max_task_attempts: params.max_task_attempts,
            max_plan_depth: params.max_plan_depth,
        }
    }
}

impl FileOrchestrationConfig {
    pub fn to_params(&self) -> OrchestrationParams {
        OrchestrationParams::default()
            .with_max_concurrent_tasks(self.max_concurrent_tasks)
            .with_task_timeout(Duration::from_secs(self.task_timeout_secs))
            .with_max_task_attempts(self.max_task_attempts)
            .with_max_plan_depth(self.max_plan_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params() {
        let params = FileOrchestrationConfig::default().to_params();
        assert_eq!(params, OrchestrationParams::default());
    }

    #[test]
    fn test_partial_section() {
        let toml_str = r#"
[orchestration]
task_timeout_secs = 30
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let params = config.orchestration.to_params();
        assert_eq!(params.task_timeout, Duration::from_secs(30));
        assert_eq!(params.max_concurrent_tasks, 3);
    }
}

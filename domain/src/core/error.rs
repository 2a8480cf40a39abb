//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Raised by pure domain logic: classifying raw chain output, materializing
/// plans and mutating per-plan scheduling state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unrecognized chain result shape: {0}")]
    UnrecognizedResult(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid tool call: {0}")]
    InvalidToolCall(String),

    #[error("Invalid judgement: {0}")]
    InvalidJudgement(String),

    #[error("Unknown chain type: {0}")]
    UnknownChainType(String),

    #[error("Unknown agent role: {0}")]
    UnknownRole(String),

    #[error("Task not found in plan {plan}: {task}")]
    TaskNotFound { plan: String, task: String },

    #[error("Task {0} is not ready: dependencies unmet or attempts exhausted")]
    TaskNotReady(String),
}

impl DomainError {
    /// Whether this error describes a malformed payload (as opposed to a
    /// lookup failure).
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            DomainError::UnrecognizedResult(_)
                | DomainError::InvalidPlan(_)
                | DomainError::InvalidToolCall(_)
                | DomainError::InvalidJudgement(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DomainError::InvalidPlan("no tasks".to_string());
        assert_eq!(error.to_string(), "Invalid plan: no tasks");

        let error = DomainError::TaskNotFound {
            plan: "p".to_string(),
            task: "t".to_string(),
        };
        assert_eq!(error.to_string(), "Task not found in plan p: t");
    }

    #[test]
    fn test_is_shape_error() {
        assert!(DomainError::UnrecognizedResult("42".to_string()).is_shape_error());
        assert!(DomainError::InvalidJudgement("score".to_string()).is_shape_error());
        assert!(!DomainError::UnknownChainType("x".to_string()).is_shape_error());
        assert!(
            !DomainError::TaskNotFound {
                plan: "p".to_string(),
                task: "t".to_string()
            }
            .is_shape_error()
        );
    }
}

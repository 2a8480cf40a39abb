//! Error handler
//!
//! Maps an [`OrchestrationError`] raised in a given [`ErrorScope`] to a
//! structured [`ErrorCode`], logs it at a level matching its severity and
//! tells the caller whether another attempt makes sense.

use crate::use_cases::orchestrate::types::{ErrorScope, OrchestrationError};
use tracing::{error, warn};
use triad_domain::{ChainType, ErrorClass, ErrorCode, InteractionError, InteractionType, Severity};

/// Outcome of handling one error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDecision {
    pub code: ErrorCode,
    pub severity: Severity,
    pub retryable: bool,
    pub message: String,
}

impl ErrorDecision {
    /// Record form attached to failed interactions.
    pub fn to_interaction_error(&self) -> InteractionError {
        InteractionError::new(self.code, self.message.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandler;

impl ErrorHandler {
    pub fn new() -> Self {
        Self
    }

    /// Pure mapping, first match wins.
    pub fn classify(&self, scope: ErrorScope, err: &OrchestrationError) -> ErrorDecision {
        let code = match err.class() {
            ErrorClass::Dependency => ErrorCode::TaskExecution,
            ErrorClass::Validation => ErrorCode::Validation,
            ErrorClass::Concurrency => ErrorCode::Concurrency,
            ErrorClass::Unclassified if err.is_configuration() => ErrorCode::ChainConfiguration,
            ErrorClass::Unclassified => Self::code_for_scope(scope),
        };
        ErrorDecision {
            code,
            severity: code.severity(),
            retryable: code.is_retryable(),
            message: err.to_string(),
        }
    }

    fn code_for_scope(scope: ErrorScope) -> ErrorCode {
        match (scope.interaction_type, scope.chain_type) {
            (Some(InteractionType::Plan), _) | (_, Some(ChainType::TaskPlanning)) => {
                ErrorCode::Planning
            }
            (Some(InteractionType::Task), _)
            | (Some(InteractionType::ToolCall), _)
            | (_, Some(ChainType::TaskExecution)) => ErrorCode::TaskExecution,
            _ => ErrorCode::Unknown,
        }
    }

    /// Classify and log.
    pub fn handle(&self, scope: ErrorScope, err: &OrchestrationError) -> ErrorDecision {
        let decision = self.classify(scope, err);
        let interaction = scope.interaction_type.map(|t| t.as_str().to_string());
        let chain = scope.chain_type.map(|t| t.as_str().to_string());
        match decision.severity {
            Severity::High => error!(
                code = decision.code.as_str(),
                retryable = decision.retryable,
                interaction = interaction.as_deref().unwrap_or("-"),
                chain = chain.as_deref().unwrap_or("-"),
                "{}: {}",
                decision.code.description(),
                decision.message
            ),
            Severity::Medium => warn!(
                code = decision.code.as_str(),
                retryable = decision.retryable,
                interaction = interaction.as_deref().unwrap_or("-"),
                chain = chain.as_deref().unwrap_or("-"),
                "{}: {}",
                decision.code.description(),
                decision.message
            ),
        }
        decision
    }
}

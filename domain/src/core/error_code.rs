//! Error taxonomy shared by the error handler and interaction records.
//!
//! | Code | Meaning | Severity | Retryable |
//! |------|---------|----------|-----------|
//! | `EC-100` | Planning error | High | Yes |
//! | `EC-101` | Validation error | High | Yes |
//! | `EC-102` | Chain configuration error | Medium | No |
//! | `EC-103` | Concurrency error (timeout / pool contention) | High | Yes |
//! | `EC-104` | Task execution or dependency error | Medium | Yes |
//! | `EC-105` | Unknown error | Medium | Yes |

use serde::{Deserialize, Serialize};

/// Structured error code attached to failed interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "EC-100")]
    Planning,
    #[serde(rename = "EC-101")]
    Validation,
    #[serde(rename = "EC-102")]
    ChainConfiguration,
    #[serde(rename = "EC-103")]
    Concurrency,
    #[serde(rename = "EC-104")]
    TaskExecution,
    #[serde(rename = "EC-105")]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Planning => "EC-100",
            ErrorCode::Validation => "EC-101",
            ErrorCode::ChainConfiguration => "EC-102",
            ErrorCode::Concurrency => "EC-103",
            ErrorCode::TaskExecution => "EC-104",
            ErrorCode::Unknown => "EC-105",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::Planning => "planning error",
            ErrorCode::Validation => "validation error",
            ErrorCode::ChainConfiguration => "chain configuration error",
            ErrorCode::Concurrency => "concurrency error",
            ErrorCode::TaskExecution => "task execution error",
            ErrorCode::Unknown => "unknown error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::Planning | ErrorCode::Validation | ErrorCode::Concurrency => Severity::High,
            _ => Severity::Medium,
        }
    }

    /// Every code except the chain configuration error may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCode::ChainConfiguration)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse error class used by the error handler before looking at the
/// interaction or chain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Task offered before its dependencies were satisfied
    Dependency,
    /// Chain result or tool call shape invalid
    Validation,
    /// Task exceeded its time budget or the pool was unavailable
    Concurrency,
    Unclassified,
}

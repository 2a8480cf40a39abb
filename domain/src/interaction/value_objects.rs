//! Interaction value objects: identifiers, participants, status and the
//! per-type payload records (message, tool call, judgement).

use crate::agent::value_objects::AgentId;
use crate::core::error::DomainError;
use crate::core::error_code::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("thread-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for ThreadId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(String);

impl InteractionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InteractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source or target of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    /// The human requester (the `USER` sentinel)
    User,
    Agent(AgentId),
}

impl Participant {
    pub const USER_SENTINEL: &'static str = "USER";

    pub fn agent(id: impl Into<AgentId>) -> Self {
        Participant::Agent(id.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Participant::User)
    }

    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Participant::Agent(id) => Some(id),
            Participant::User => None,
        }
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Participant::User => write!(f, "{}", Self::USER_SENTINEL),
            Participant::Agent(id) => write!(f, "{}", id),
        }
    }
}

/// Lifecycle status shared by interactions and task states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionStatus::Pending => "PENDING",
            InteractionStatus::InProgress => "IN_PROGRESS",
            InteractionStatus::Success => "SUCCESS",
            InteractionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InteractionStatus::Success | InteractionStatus::Failed)
    }
}

impl std::fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminant of [`crate::interaction::InteractionPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    Message,
    Task,
    Plan,
    ToolCall,
    Judgement,
}

impl InteractionType {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionType::Message => "MESSAGE",
            InteractionType::Task => "TASK",
            InteractionType::Plan => "PLAN",
            InteractionType::ToolCall => "TOOL_CALL",
            InteractionType::Judgement => "JUDGEMENT",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured error attached to a failed interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionError {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl InteractionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    /// Plain text, or JSON-serialized structured output
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A connector function invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Connector / tool id
    pub tool: String,
    pub function: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, function: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            function: function.into(),
            parameters,
            result: None,
        }
    }

    /// Parse the `execution` object of a raw chain result.
    ///
    /// Accepts `{tool|connector, function|functionName, parameters|params}`.
    pub fn from_execution(execution: &serde_json::Value) -> Result<Self, DomainError> {
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| execution.get(*k).and_then(|v| v.as_str()))
                .map(str::to_string)
        };

        let tool = field(&["tool", "connector", "toolId"])
            .ok_or_else(|| DomainError::InvalidToolCall("missing tool".to_string()))?;
        let function = field(&["function", "functionName", "function_name"])
            .ok_or_else(|| DomainError::InvalidToolCall("missing function".to_string()))?;
        let parameters = ["parameters", "params", "arguments"]
            .iter()
            .find_map(|k| execution.get(*k).cloned())
            .unwrap_or_else(|| serde_json::json!({}));

        Ok(Self::new(tool, function, parameters))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tool.trim().is_empty() {
            return Err(DomainError::InvalidToolCall("tool name is empty".to_string()));
        }
        if self.function.trim().is_empty() {
            return Err(DomainError::InvalidToolCall("function name is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgementAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Points the result failed to cover; folded into the next attempt
    #[serde(default)]
    pub missing: Vec<String>,
}

/// A validator's verdict on a task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    pub satisfied: bool,
    /// 0–100
    pub score: u8,
    #[serde(default)]
    pub analysis: JudgementAnalysis,
    #[serde(default)]
    pub feedback: String,
}

fn text_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

impl Judgement {
    pub fn satisfied(score: u8) -> Self {
        Self {
            satisfied: true,
            score,
            analysis: JudgementAnalysis::default(),
            feedback: String::new(),
        }
    }

    pub fn unsatisfied(feedback: impl Into<String>, missing: Vec<String>) -> Self {
        Self {
            satisfied: false,
            score: 0,
            analysis: JudgementAnalysis {
                missing,
                ..Default::default()
            },
            feedback: feedback.into(),
        }
    }

    /// Parse a raw judgement object. `satisfied` is required; a missing
    /// score defaults to 100 for a pass and 0 for a fail.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, DomainError> {
        let satisfied = json
            .get("satisfied")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| DomainError::InvalidJudgement("satisfied must be a boolean".to_string()))?;

        let score = match json.get("score") {
            None | Some(serde_json::Value::Null) => {
                if satisfied {
                    100
                } else {
                    0
                }
            }
            Some(v) => {
                let raw = v
                    .as_f64()
                    .ok_or_else(|| DomainError::InvalidJudgement("score must be a number".to_string()))?;
                if !(0.0..=100.0).contains(&raw) {
                    return Err(DomainError::InvalidJudgement(format!(
                        "score {} outside 0-100",
                        raw
                    )));
                }
                raw.round() as u8
            }
        };

        let analysis = json.get("analysis");
        let analysis = JudgementAnalysis {
            strengths: text_list(analysis.and_then(|a| a.get("strengths"))),
            weaknesses: text_list(analysis.and_then(|a| a.get("weaknesses"))),
            missing: text_list(analysis.and_then(|a| a.get("missing"))),
        };

        let feedback = json
            .get("feedback")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            satisfied,
            score,
            analysis,
            feedback,
        })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.score > 100 {
            return Err(DomainError::InvalidJudgement(format!(
                "score {} outside 0-100",
                self.score
            )));
        }
        Ok(())
    }
}

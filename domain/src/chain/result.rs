//! Chain results as a tagged union.
//!
//! Adapters at the chain boundary turn raw model output into a
//! [`ChainResult`] once, via [`ChainResult::from_value`]; everything past the
//! boundary pattern-matches on the variant instead of probing object keys.

use crate::core::error::DomainError;
use crate::interaction::value_objects::{InteractionType, Judgement, ToolCall};
use crate::plan::proposal::PlanProposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChainResult {
    ToolCall(ToolCall),
    Plan(PlanProposal),
    Judgement(Judgement),
    Message(String),
}

impl ChainResult {
    /// Classify a raw chain output by shape:
    ///
    /// - object with `execution` → tool call
    /// - object with `goal` → plan
    /// - object with `satisfied` → judgement
    /// - string → message
    ///
    /// Any other shape is rejected.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DomainError> {
        match value {
            serde_json::Value::String(text) => Ok(ChainResult::Message(text)),
            serde_json::Value::Object(ref map) if map.contains_key("execution") => {
                ToolCall::from_execution(&map["execution"]).map(ChainResult::ToolCall)
            }
            serde_json::Value::Object(ref map) if map.contains_key("goal") => {
                PlanProposal::from_json(&value).map(ChainResult::Plan)
            }
            serde_json::Value::Object(ref map) if map.contains_key("satisfied") => {
                Judgement::from_json(&value).map(ChainResult::Judgement)
            }
            other => Err(DomainError::UnrecognizedResult(crate::core::string::truncate(
                &other.to_string(),
                120,
            ))),
        }
    }

    pub fn interaction_type(&self) -> InteractionType {
        match self {
            ChainResult::ToolCall(_) => InteractionType::ToolCall,
            ChainResult::Plan(_) => InteractionType::Plan,
            ChainResult::Judgement(_) => InteractionType::Judgement,
            ChainResult::Message(_) => InteractionType::Message,
        }
    }

    /// Structured form of the result, stored as task output.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ChainResult::Message(text) => serde_json::Value::String(text.clone()),
            ChainResult::ToolCall(call) => serde_json::to_value(call).unwrap_or_default(),
            ChainResult::Plan(plan) => serde_json::to_value(plan).unwrap_or_default(),
            ChainResult::Judgement(judgement) => serde_json::to_value(judgement).unwrap_or_default(),
        }
    }

    /// Text form of the result; structured variants are JSON-serialized.
    pub fn render(&self) -> String {
        match self {
            ChainResult::Message(text) => text.clone(),
            other => other.to_value().to_string(),
        }
    }
}

/// Outcome envelope returned by a chain executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub result: Option<ChainResult>,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time spent in the chain
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
}

impl ChainExecutionResult {
    pub fn ok(result: ChainResult, execution_time: Duration) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            timestamp: Utc::now(),
            execution_time,
        }
    }

    pub fn failed(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            execution_time,
        }
    }

    /// The result if the chain succeeded, otherwise its error text.
    pub fn into_result(self) -> Result<ChainResult, String> {
        match (self.success, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err("chain reported success without a result".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "chain failed".to_string())),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_string_as_message() {
        let result = ChainResult::from_value(json!("hello there")).unwrap();
        assert_eq!(result, ChainResult::Message("hello there".to_string()));
        assert_eq!(result.interaction_type(), InteractionType::Message);
    }

    #[test]
    fn test_classify_tool_call() {
        let result = ChainResult::from_value(json!({
            "execution": {"tool": "sheets", "function": "read_range", "parameters": {"range": "A1:B2"}}
        }))
        .unwrap();
        match result {
            ChainResult::ToolCall(call) => {
                assert_eq!(call.tool, "sheets");
                assert_eq!(call.function, "read_range");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plan_and_judgement() {
        let plan = ChainResult::from_value(json!({
            "goal": "g",
            "tasks": [{"step": 1, "instruction": "do it"}]
        }))
        .unwrap();
        assert_eq!(plan.interaction_type(), InteractionType::Plan);

        let judgement = ChainResult::from_value(json!({"satisfied": true, "score": 90})).unwrap();
        assert_eq!(judgement.interaction_type(), InteractionType::Judgement);
    }

    #[test]
    fn test_unrecognized_shapes_fail() {
        assert!(matches!(
            ChainResult::from_value(json!(42)),
            Err(DomainError::UnrecognizedResult(_))
        ));
        assert!(ChainResult::from_value(json!({"answer": "x"})).is_err());
        assert!(ChainResult::from_value(json!(null)).is_err());
        assert!(ChainResult::from_value(json!(["a"])).is_err());
    }

    #[test]
    fn test_execution_result_into_result() {
        let ok = ChainExecutionResult::ok(ChainResult::Message("m".into()), Duration::from_millis(5));
        assert_eq!(ok.into_result().unwrap(), ChainResult::Message("m".into()));

        let failed = ChainExecutionResult::failed("rate limited", Duration::ZERO);
        assert_eq!(failed.into_result().unwrap_err(), "rate limited");
    }

    #[test]
    fn test_execution_time_serializes_as_millis() {
        let ok = ChainExecutionResult::ok(ChainResult::Message("m".into()), Duration::from_millis(1500));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["execution_time"], 1500);
    }
}

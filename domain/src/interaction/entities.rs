//! Interaction entity.

use super::value_objects::{
    InteractionError, InteractionId, InteractionStatus, InteractionType, Judgement, Message,
    Participant, ThreadId, ToolCall,
};
use crate::plan::entities::{Plan, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type-specific content of an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionPayload {
    Message(Message),
    Task(Task),
    Plan(Plan),
    ToolCall(ToolCall),
    Judgement(Judgement),
}

impl InteractionPayload {
    pub fn interaction_type(&self) -> InteractionType {
        match self {
            InteractionPayload::Message(_) => InteractionType::Message,
            InteractionPayload::Task(_) => InteractionType::Task,
            InteractionPayload::Plan(_) => InteractionType::Plan,
            InteractionPayload::ToolCall(_) => InteractionType::ToolCall,
            InteractionPayload::Judgement(_) => InteractionType::Judgement,
        }
    }
}

/// A typed, timestamped record of one step in a thread.
///
/// Identity (`id`, `thread_id`, participants, `created_at`) never changes;
/// status and payload are updated in place by the pipeline step that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub thread_id: ThreadId,
    pub source: Participant,
    pub target: Participant,
    pub status: InteractionStatus,
    #[serde(default)]
    pub error: Option<InteractionError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: InteractionPayload,
}

impl Interaction {
    pub fn new(
        thread_id: ThreadId,
        source: Participant,
        target: Participant,
        payload: InteractionPayload,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InteractionId::generate(),
            thread_id,
            source,
            target,
            status: InteractionStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            payload,
        }
    }

    pub fn interaction_type(&self) -> InteractionType {
        self.payload.interaction_type()
    }

    pub fn set_status(&mut self, status: InteractionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn start(&mut self) {
        self.set_status(InteractionStatus::InProgress);
    }

    pub fn succeed(&mut self) {
        self.set_status(InteractionStatus::Success);
    }

    /// Marks the interaction FAILED and attaches the structured error.
    pub fn fail(&mut self, error: InteractionError) {
        self.error = Some(error);
        self.set_status(InteractionStatus::Failed);
    }

    pub fn with_status(mut self, status: InteractionStatus) -> Self {
        self.set_status(status);
        self
    }

    pub fn as_message(&self) -> Option<&Message> {
        match &self.payload {
            InteractionPayload::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_plan(&self) -> Option<&Plan> {
        match &self.payload {
            InteractionPayload::Plan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_judgement(&self) -> Option<&Judgement> {
        match &self.payload {
            InteractionPayload::Judgement(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match &self.payload {
            InteractionPayload::ToolCall(c) => Some(c),
            _ => None,
        }
    }

    /// Text rendering of the payload, used when echoing a result to the user.
    pub fn render(&self) -> String {
        match &self.payload {
            InteractionPayload::Message(m) => m.content.clone(),
            InteractionPayload::Task(t) => t.instruction.clone(),
            InteractionPayload::Plan(p) => serde_json::to_string(p).unwrap_or_else(|_| p.goal.clone()),
            InteractionPayload::ToolCall(c) => match &c.result {
                Some(result) => crate::core::string::value_to_text(result),
                None => format!("{}.{}", c.tool, c.function),
            },
            InteractionPayload::Judgement(j) => {
                serde_json::to_string(j).unwrap_or_else(|_| j.feedback.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_code::ErrorCode;

    fn message_interaction() -> Interaction {
        Interaction::new(
            ThreadId::new("thread-1"),
            Participant::User,
            Participant::agent("planner"),
            InteractionPayload::Message(Message::user("hello")),
        )
    }

    #[test]
    fn test_new_interaction_is_pending() {
        let interaction = message_interaction();
        assert_eq!(interaction.status, InteractionStatus::Pending);
        assert_eq!(interaction.interaction_type(), InteractionType::Message);
        assert!(interaction.error.is_none());
        assert_eq!(interaction.render(), "hello");
    }

    #[test]
    fn test_fail_attaches_error() {
        let mut interaction = message_interaction();
        interaction.start();
        assert_eq!(interaction.status, InteractionStatus::InProgress);
        interaction.fail(InteractionError::new(ErrorCode::Validation, "bad shape"));
        assert_eq!(interaction.status, InteractionStatus::Failed);
        assert_eq!(interaction.error.as_ref().unwrap().code, ErrorCode::Validation);
        assert!(interaction.updated_at >= interaction.created_at);
    }

    #[test]
    fn test_payload_serializes_with_type_tag() {
        let json = serde_json::to_value(message_interaction()).unwrap();
        assert_eq!(json["payload"]["type"], "MESSAGE");
        assert_eq!(json["payload"]["data"]["content"], "hello");
    }

    #[test]
    fn test_render_tool_call_result() {
        let mut call = ToolCall::new("sheets", "read", serde_json::json!({}));
        call.result = Some(serde_json::json!("A1: 42"));
        let interaction = Interaction::new(
            ThreadId::new("t"),
            Participant::agent("a"),
            Participant::User,
            InteractionPayload::ToolCall(call),
        );
        assert_eq!(interaction.render(), "A1: 42");
    }
}

//! Interaction domain module: the uniform record of every step in a thread.
//!
//! An [`Interaction`] is one of five kinds, carried as a tagged
//! [`InteractionPayload`]:
//!
//! | Type | Payload | Produced by |
//! |------|---------|-------------|
//! | `MESSAGE` | [`Message`] | user input, plain chain output, summaries |
//! | `TASK` | [`Task`](crate::plan::Task) | task execution |
//! | `PLAN` | [`Plan`](crate::plan::Plan) | planning chains |
//! | `TOOL_CALL` | [`ToolCall`] | chains requesting a connector call |
//! | `JUDGEMENT` | [`Judgement`] | validators |
//!
//! Every interaction moves through `PENDING → IN_PROGRESS → SUCCESS | FAILED`.

pub mod entities;
pub mod value_objects;

pub use entities::{Interaction, InteractionPayload};
pub use value_objects::{
    InteractionError, InteractionId, InteractionStatus, InteractionType, Judgement,
    JudgementAnalysis, Message, MessageRole, Participant, ThreadId, ToolCall,
};

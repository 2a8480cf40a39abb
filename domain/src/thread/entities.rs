//! Thread entity: the top-level work session owning all interactions.

use crate::interaction::entities::Interaction;
use crate::interaction::value_objects::{InteractionId, InteractionType, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadStatus {
    #[default]
    Idle,
    Active,
    Completed,
    Failed,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ThreadStatus::Idle => "IDLE",
            ThreadStatus::Active => "ACTIVE",
            ThreadStatus::Completed => "COMPLETED",
            ThreadStatus::Failed => "FAILED",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ThreadStatus::Completed | ThreadStatus::Failed)
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conversation/work session.
///
/// Interactions are append-only: the thread keeps its full history for
/// audit and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub status: ThreadStatus,
    /// Human-readable failure reason
    #[serde(default)]
    pub error: Option<String>,
    interactions: Vec<Interaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Thread {
    fn default() -> Self {
        Self::new(ThreadId::generate())
    }
}

impl Thread {
    pub fn new(id: impl Into<ThreadId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: ThreadStatus::Idle,
            error: None,
            interactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn activate(&mut self) {
        self.status = ThreadStatus::Active;
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = ThreadStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ThreadStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Appends an interaction and returns its id.
    pub fn append(&mut self, interaction: Interaction) -> InteractionId {
        let id = interaction.id.clone();
        self.interactions.push(interaction);
        self.updated_at = Utc::now();
        id
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction(&self, id: &InteractionId) -> Option<&Interaction> {
        self.interactions.iter().find(|i| &i.id == id)
    }

    pub fn interaction_mut(&mut self, id: &InteractionId) -> Option<&mut Interaction> {
        self.interactions.iter_mut().find(|i| &i.id == id)
    }

    /// Position of an interaction in the history.
    pub fn position(&self, id: &InteractionId) -> Option<usize> {
        self.interactions.iter().position(|i| &i.id == id)
    }

    pub fn of_type(&self, kind: InteractionType) -> impl Iterator<Item = &Interaction> {
        self.interactions
            .iter()
            .filter(move |i| i.interaction_type() == kind)
    }

    pub fn last(&self) -> Option<&Interaction> {
        self.interactions.last()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

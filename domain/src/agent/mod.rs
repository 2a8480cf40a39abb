//! Agent domain module
//!
//! Agents bind a chain to a role (executor, validator, summarizer) and
//! a set of tools.

pub mod entities;
pub mod value_objects;

pub use entities::Agent;
pub use value_objects::{AgentId, AgentRole};

//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod error_handler;
pub mod orchestrate;
pub mod state_manager;

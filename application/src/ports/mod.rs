//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent_registry;
pub mod chain_executor;
pub mod status_sink;
pub mod tool_executor;

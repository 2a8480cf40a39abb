//! Application-level configuration.
//!
//! - [`OrchestrationParams`]: scheduler limits (concurrency, timeout, attempts, nesting)

pub mod orchestration_params;

pub use orchestration_params::OrchestrationParams;

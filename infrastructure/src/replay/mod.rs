//! Script-driven adapters
//!
//! A replay script stands in for real chains and connectors so that the
//! engine can run end to end without an LLM:
//!
//! ```json
//! {
//!   "chains": {
//!     "planner-chain": [{"goal": "...", "tasks": [...]}],
//!     "exec-chain": ["3 rows", {"execution": {"tool": "sheets", "function": "read"}}],
//!     "judge-chain": [{"satisfied": true, "score": 90, "feedback": "ok"}]
//!   },
//!   "tools": {
//!     "sheets": {"read": {"rows": 3}}
//!   }
//! }
//! ```
//!
//! Each chain call pops the next raw value for its chain and classifies it
//! with [`ChainResult::from_value`](triad_domain::ChainResult::from_value).
//! An object of the form `{"error": "..."}` replays a failed execution.

mod chain;
mod script;
mod tool;

pub use chain::ReplayChainExecutor;
pub use script::{ReplayError, ReplayScript};
pub use tool::ReplayToolExecutor;

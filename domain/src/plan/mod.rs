//! Plan domain module
//!
//! Plans, tasks and the planner-facing proposal format.

pub mod entities;
pub mod proposal;
pub mod value_objects;

pub use entities::{Plan, Task};
pub use proposal::{PlanProposal, TaskProposal};
pub use value_objects::{PlanId, TaskId};

//! Chain domain module: the LLM-call abstraction as seen by the core.

pub mod result;
pub mod value_objects;

pub use result::{ChainExecutionResult, ChainResult};
pub use value_objects::{ChainInput, ChainType, split_requirement};

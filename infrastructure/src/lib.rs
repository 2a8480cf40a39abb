//! Infrastructure layer for triad
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod registry;
pub mod replay;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOrchestrationConfig, FileOutputConfig, FileOutputFormat, FileSpecialistsConfig,
};
pub use logging::{JsonlContextDump, TracingStatusSink};
pub use registry::InMemoryAgentRegistry;
pub use replay::{ReplayChainExecutor, ReplayError, ReplayScript, ReplayToolExecutor};

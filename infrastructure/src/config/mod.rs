//! Configuration file loading for triad
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TRIAD_`-prefixed environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./triad.toml` or `./.triad.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/triad/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOrchestrationConfig, FileOutputConfig, FileOutputFormat, FileSpecialistsConfig,
};
pub use loader::ConfigLoader;

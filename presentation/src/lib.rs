//! Presentation layer for triad
//!
//! This crate contains CLI definitions, the console status sink and
//! thread output formatters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ThreadFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::status::ConsoleStatusSink;

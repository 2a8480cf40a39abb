//! Output formatter trait

use triad_domain::Thread;

/// Trait for formatting a finished thread
pub trait OutputFormatter {
    /// Every interaction, then the final answer
    fn format(&self, thread: &Thread) -> String;

    /// The whole thread as JSON
    fn format_json(&self, thread: &Thread) -> String;

    /// Final answer only (concise output)
    fn format_answer(&self, thread: &Thread) -> String;
}

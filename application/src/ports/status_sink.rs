//! Working-status port
//!
//! Fire-and-forget status lines for the UI ("Planning...", "Running step 2 of 3").
//! Implementations live in the presentation and infrastructure layers and
//! must not block.

/// Callback for working-status updates during orchestration
pub trait StatusSink: Send + Sync {
    /// Replace the current status line
    fn set_working_status(&self, text: &str);

    /// Append detail to the current status
    fn append_working_status(&self, text: &str);
}

/// No-op status sink for when status reporting is not needed
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn set_working_status(&self, _text: &str) {}
    fn append_working_status(&self, _text: &str) {}
}

use std::sync::Mutex;
use tracing::info;
use triad_application::StatusSink;

/// Status sink that logs each update at info level.
///
/// Appended text is joined onto the last status so the log line reads
/// like the status a UI would show.
#[derive(Default)]
pub struct TracingStatusSink {
    current: Mutex<String>,
}

impl TracingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> String {
        self.current.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl StatusSink for TracingStatusSink {
    fn set_working_status(&self, text: &str) {
        if let Ok(mut current) = self.current.lock() {
            *current = text.to_string();
        }
        info!(target: "triad::status", "{}", text);
    }

    fn append_working_status(&self, text: &str) {
        if let Ok(mut current) = self.current.lock() {
            current.push_str(text);
            info!(target: "triad::status", "{}", current);
        }
    }
}

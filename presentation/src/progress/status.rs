//! Console status sink

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use triad_application::StatusSink;

/// Shows the working status on a single spinner line
pub struct ConsoleStatusSink {
    spinner: ProgressBar,
    current: Mutex<String>,
}

impl ConsoleStatusSink {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(spinner)
    }

    /// A sink that tracks the status without drawing anything
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(spinner: ProgressBar) -> Self {
        Self {
            spinner,
            current: Mutex::new(String::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    pub fn current(&self) -> String {
        self.current.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Remove the spinner line
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for ConsoleStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ConsoleStatusSink {
    fn set_working_status(&self, text: &str) {
        if let Ok(mut current) = self.current.lock() {
            *current = text.to_string();
        }
        self.spinner.set_message(text.to_string());
    }

    fn append_working_status(&self, text: &str) {
        if let Ok(mut current) = self.current.lock() {
            current.push_str(text);
            self.spinner.set_message(current.clone());
        }
    }
}

//! JSONL file writer for plan execution contexts.
//!
//! Each record carries a `type`, a `timestamp`, the plan id and depth, and
//! the context exactly as
//! [`PlanExecutionStateManager::serialize_context`] produced it, so a line
//! can be fed back to `restore_context`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use triad_application::{OrchestrationError, PlanExecutionStateManager};
use triad_domain::PlanId;

/// JSONL writer for plan contexts.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlContextDump {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlContextDump {
    /// Create the dump file (and parent directories).
    ///
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create context dump directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create context dump file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every active plan context. Returns the number of records written.
    ///
    /// A plan that cannot be serialized or written is skipped with a warning.
    pub fn dump(&self, state: &PlanExecutionStateManager) -> usize {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut written = 0;

        for plan_id in state.active_plans() {
            let line = match Self::record_line(state, &plan_id, &timestamp) {
                Ok(line) => line,
                Err(e) => {
                    warn!(plan = %plan_id, "Skipped plan context: {}", e);
                    continue;
                }
            };
            let Ok(mut writer) = self.writer.lock() else {
                warn!(plan = %plan_id, "Context dump writer is poisoned");
                continue;
            };
            match writeln!(writer, "{}", line) {
                Ok(()) => written += 1,
                Err(e) => warn!(
                    plan = %plan_id,
                    "Could not write plan context to {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }

        if let Ok(mut writer) = self.writer.lock()
            && let Err(e) = writer.flush()
        {
            warn!("Could not flush context dump {}: {}", self.path.display(), e);
        }
        written
    }

    fn record_line(
        state: &PlanExecutionStateManager,
        plan_id: &PlanId,
        timestamp: &str,
    ) -> Result<String, OrchestrationError> {
        let depth = state.depth(plan_id)?;
        let context: serde_json::Value = serde_json::from_str(&state.serialize_context(plan_id)?)?;
        let record = serde_json::json!({
            "type": "plan_context",
            "timestamp": timestamp,
            "plan_id": plan_id,
            "depth": depth,
            "context": context,
        });
        Ok(serde_json::to_string(&record)?)
    }
}

impl Drop for JsonlContextDump {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

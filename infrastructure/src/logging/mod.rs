//! Logging infrastructure: status lines and plan-context dumps.
//!
//! - [`TracingStatusSink`] forwards working-status updates to `tracing`
//! - [`JsonlContextDump`] appends serialized plan contexts to a JSONL file

mod context_dump;
mod status;

pub use context_dump::JsonlContextDump;
pub use status::TracingStatusSink;

//! Output formatting for finished threads

pub mod console;
pub mod formatter;

//! Working-status reporting

pub mod status;

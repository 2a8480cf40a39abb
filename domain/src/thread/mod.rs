//! Thread domain module

pub mod entities;

pub use entities::{Thread, ThreadStatus};

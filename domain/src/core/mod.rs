//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`error_code::ErrorCode`]: structured error codes (`EC-100`..`EC-105`)
//! - [`string`]: small text helpers for status lines and prompts

pub mod error;
pub mod error_code;
pub mod string;

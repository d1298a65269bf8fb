//! Common utility functions shared across the Runbook crates.
//!
//! # Design Principles
//!
//! - **Pure functions only** - no side effects, no I/O
//! - **Minimal dependencies** - only chrono for datetime utilities

pub mod datetime;
pub mod string;

// Re-export commonly used functions at crate root for convenience
pub use datetime::{from_millis, to_millis, Millis, NEVER};
pub use string::{is_blank, none_if_blank};

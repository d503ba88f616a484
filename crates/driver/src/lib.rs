//! sepcheck driver library.
//!
//! Argument parsing, parallel checking and report rendering, exported for the
//! binary and for integration tests.

pub mod cli;
pub mod json_output;
pub mod output;
pub mod parallel;

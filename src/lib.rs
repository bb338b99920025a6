//! golden-plot - golden-file regression runner for plotting tools
//!
//! Runs command-line plotting tools against fixture inputs and compares the
//! images they produce with checked-in golden outputs.

pub mod checksum;
pub mod cli;
pub mod commands;
pub mod common;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use suite::{Outcome, SuiteReport, TestCase, TestSuite};

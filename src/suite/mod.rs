//! Golden-file regression suites
//!
//! Reads a YAML registry of test cases, runs each plotting tool against its
//! fixture, and compares the generated image with a checked-in golden file by
//! checksum.

mod bless;
mod config;
mod report;
mod runner;

pub use bless::{bless_case, bless_suite, BlessOutcome};
pub use config::*;
pub use report::{CaseResult, Outcome, SuiteReport};
pub use runner::{prepare_suite, run_case, run_suite, PreparedCase, RunOptions, ScratchOutput};

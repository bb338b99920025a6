//! Per-case outcomes and the suite report

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::checksum::Checksum;

/// How a single case ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Generated output and golden file have the same checksum
    Identical,
    /// Checksums differ
    Mismatch { expected: Checksum, actual: Checksum },
    /// Tool exited unsuccessfully; `None` means it was killed by a signal
    ToolFailed { exit_code: Option<i32> },
    /// Tool could not be started at all
    ToolNotRunnable { reason: String },
    /// Tool succeeded but wrote nothing at the output path
    OutputMissing,
    /// No golden file to compare against
    GoldenMissing,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Identical)
    }
}

/// Result of running one test case
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub golden: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Aggregated results of a suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub passed: usize,
    pub failed: usize,
    /// Cases skipped because an earlier case failed with fail-fast on
    pub skipped: usize,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    pub fn new(suite: String) -> Self {
        Self {
            suite,
            passed: 0,
            failed: 0,
            skipped: 0,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: CaseResult) {
        if result.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Print the label line for a case about to run
pub fn print_case_header(name: &str, tool: &str, input: &str) {
    println!(
        "{} {} on {}",
        format!("{}:", name).white().bold(),
        tool,
        input.dimmed()
    );
}

/// Print the pass/fail line for a finished case
pub fn print_case_result(result: &CaseResult) {
    let golden = result.golden.display().to_string();

    match &result.outcome {
        Outcome::Identical => {
            println!("  {} {} identical", "✓".green(), golden);
        }
        Outcome::Mismatch { expected, actual } => {
            println!("  {} {} does not match", "✗".red(), golden);
            println!("      expected {}", expected.to_string().dimmed());
            println!("      actual   {}", actual.to_string().dimmed());
        }
        Outcome::ToolFailed { exit_code } => {
            let how = match exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "was terminated by a signal".to_string(),
            };
            println!("  {} {} not compared: tool {}", "✗".red(), golden, how);
        }
        Outcome::ToolNotRunnable { reason } => {
            println!(
                "  {} {} not compared: tool could not be started ({})",
                "✗".red(),
                golden,
                reason
            );
        }
        Outcome::OutputMissing => {
            println!(
                "  {} {} not compared: tool produced no output",
                "✗".red(),
                golden
            );
        }
        Outcome::GoldenMissing => {
            println!("  {} {} is missing", "✗".red(), golden);
        }
    }
}

/// Print the closing summary line
pub fn print_summary(report: &SuiteReport) {
    let counts = format!(
        "{} passed, {} failed{}",
        report.passed,
        report.failed,
        if report.skipped > 0 {
            format!(", {} skipped", report.skipped)
        } else {
            String::new()
        }
    );

    if report.success() {
        println!("\n{} {}", "✓".green().bold(), counts.green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), counts.red().bold());
    }
}

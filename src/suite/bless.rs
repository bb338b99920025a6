//! Golden file regeneration
//!
//! Re-runs cases and replaces their golden files with the freshly generated
//! output. Cases whose tool fails keep their existing golden file.

use std::path::Path;

use colored::Colorize;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::report::{self, Outcome};
use super::runner::{self, Invocation, PreparedCase, RunOptions, ScratchOutput};

/// What bless did for one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlessOutcome {
    /// Golden file already matched the output
    Unchanged,
    /// Golden file was written (created or replaced)
    Updated,
    /// Tool did not produce output; golden left alone
    Failed(Outcome),
}

/// Bless a single prepared case
pub async fn bless_case(case: &PreparedCase, opts: &RunOptions) -> Result<BlessOutcome> {
    let scratch = ScratchOutput::claim(&case.output)?;

    if let Invocation::Failed(outcome) = runner::invoke(case, &scratch, opts.verbose).await {
        return Ok(BlessOutcome::Failed(outcome));
    }

    let Some(actual) = runner::checksum_if_present(opts.algorithm, scratch.path()).await? else {
        return Ok(BlessOutcome::Failed(Outcome::OutputMissing));
    };
    let expected = runner::checksum_if_present(opts.algorithm, &case.golden).await?;

    if expected.as_ref() == Some(&actual) {
        return Ok(BlessOutcome::Unchanged);
    }

    tokio::fs::copy(scratch.path(), &case.golden)
        .await
        .map_err(|e| Error::Bless {
            path: case.golden.clone(),
            source: e,
        })?;
    tracing::info!(
        case = %case.name,
        golden = %case.golden.display(),
        %actual,
        "Updated golden file"
    );

    Ok(BlessOutcome::Updated)
}

/// Bless every selected case of a suite; returns true when no tool failed
pub async fn bless_suite(suite_path: &Path, config: &Config, opts: &RunOptions) -> Result<bool> {
    let (_, cases) =
        runner::prepare_suite(suite_path, config, opts.filter.as_deref(), &opts.output_flag)?;
    let mut all_ok = true;

    for case in &cases {
        report::print_case_header(&case.name, &case.tool_label, &case.input_label);
        let golden = case.golden_label.display().to_string();

        match bless_case(case, opts).await? {
            BlessOutcome::Unchanged => {
                println!("  {} {} unchanged", "=".dimmed(), golden);
            }
            BlessOutcome::Updated => {
                println!("  {} {} updated", "✓".green(), golden.bold());
            }
            BlessOutcome::Failed(outcome) => {
                all_ok = false;
                report::print_case_result(&report::CaseResult {
                    name: case.name.clone(),
                    golden: case.golden_label.clone(),
                    outcome,
                });
            }
        }
    }

    Ok(all_ok)
}

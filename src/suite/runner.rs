//! Test runner implementation
//!
//! Runs each case of a suite in registration order: invoke the tool, checksum
//! the generated output and the golden file, report, and remove the generated
//! output.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command as TokioCommand;

use crate::checksum::{Algorithm, Checksum};
use crate::common::config::Config;
use crate::common::{paths, Error, Result};

use super::config::{TestCase, TestSuite};
use super::report::{self, CaseResult, Outcome, SuiteReport};

/// Options for a suite run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only run cases whose name contains this substring
    pub filter: Option<String>,
    /// Stop after the first failing case
    pub fail_fast: bool,
    /// Checksum algorithm
    pub algorithm: Algorithm,
    /// Flag preceding the output path when the suite does not set one
    pub output_flag: String,
    /// Show tool command lines and tool output
    pub verbose: bool,
    /// Suppress the human-readable lines (JSON mode)
    pub quiet: bool,
}

impl RunOptions {
    /// Options seeded from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: None,
            fail_fast: config.runner.fail_fast,
            algorithm: config.checksum.algorithm,
            output_flag: config.runner.output_flag.clone(),
            verbose: false,
            quiet: false,
        }
    }
}

/// A test case with every path resolved against the suite directory
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub name: String,
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Resolved tool path (the script when an interpreter is used)
    pub tool: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub golden: PathBuf,
    /// Golden path as written in the suite, for messages
    pub golden_label: PathBuf,
    pub tool_label: String,
    pub input_label: String,
    pub workdir: PathBuf,
}

impl PreparedCase {
    /// Resolve a case against `suite_dir`
    ///
    /// `suite_dir` should be absolute so that the tool path does not depend on
    /// how the platform treats relative programs combined with `current_dir`.
    pub fn prepare(
        case: &TestCase,
        suite_dir: &Path,
        output_flag: &str,
        config: &Config,
    ) -> Self {
        let tool = resolve_tool(suite_dir, &case.tool);
        let input = paths::resolve(suite_dir, &case.input);
        let output = paths::resolve(suite_dir, &case.output);
        let golden = paths::resolve(suite_dir, &case.golden);

        let interpreter = case
            .interpreter
            .as_deref()
            .or_else(|| config.interpreter_for(&case.tool));

        let mut args: Vec<OsString> = Vec::new();
        let program = match interpreter {
            Some(interpreter) => {
                args.push(tool.clone().into_os_string());
                OsString::from(interpreter)
            }
            None => tool.clone().into_os_string(),
        };
        args.extend(case.args.iter().map(OsString::from));
        args.push(input.clone().into_os_string());
        args.push(OsString::from(output_flag));
        args.push(output.clone().into_os_string());

        Self {
            name: case.name.clone(),
            program,
            args,
            tool,
            input,
            output,
            golden,
            golden_label: case.golden.clone(),
            tool_label: case.tool.display().to_string(),
            input_label: case.input.display().to_string(),
            workdir: suite_dir.to_path_buf(),
        }
    }

    /// Printable command line
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the tool subprocess
    pub fn command(&self, verbose: bool) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(if verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stderr(if verbose {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        cmd
    }
}

/// Tools are looked up next to the suite first, then on PATH for bare names
fn resolve_tool(suite_dir: &Path, tool: &Path) -> PathBuf {
    let local = paths::resolve(suite_dir, tool);
    if local.exists() || tool.components().count() > 1 {
        return local;
    }
    match which::which(tool) {
        Ok(found) => paths::normalize(&found),
        Err(e) => {
            tracing::debug!("Tool '{}' not found on PATH: {}", tool.display(), e);
            local
        }
    }
}

/// Owns the generated-output path for the duration of one case
///
/// Any stale file is removed on creation and the path is removed again on
/// drop, on every exit path of the case.
pub struct ScratchOutput {
    path: PathBuf,
}

impl ScratchOutput {
    pub fn claim(path: &Path) -> Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed stale output '{}'", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Cleanup {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchOutput {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove generated output '{}': {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Outcome of invoking the tool for a case
pub(crate) enum Invocation {
    /// Tool exited successfully and the output file exists
    Produced,
    /// Anything else; carries the outcome to report
    Failed(Outcome),
}

/// Run the tool and check that it left an output file behind
pub(crate) async fn invoke(
    case: &PreparedCase,
    scratch: &ScratchOutput,
    verbose: bool,
) -> Invocation {
    if verbose {
        println!("  $ {}", case.command_line());
    }
    tracing::debug!(case = %case.name, "Running {}", case.command_line());

    let status = match case.command(verbose).status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(case = %case.name, "Failed to start tool: {}", e);
            return Invocation::Failed(Outcome::ToolNotRunnable {
                reason: e.to_string(),
            });
        }
    };

    if !status.success() {
        tracing::debug!(case = %case.name, "Tool exited with {:?}", status.code());
        return Invocation::Failed(Outcome::ToolFailed {
            exit_code: status.code(),
        });
    }

    if !scratch.path().exists() {
        return Invocation::Failed(Outcome::OutputMissing);
    }

    Invocation::Produced
}

/// Checksum `path`, mapping a missing file to `None`
pub(crate) async fn checksum_if_present(
    algorithm: Algorithm,
    path: &Path,
) -> Result<Option<Checksum>> {
    match Checksum::of_file(algorithm, path).await {
        Ok(sum) => Ok(Some(sum)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::checksum_io(path, e)),
    }
}

/// Run one prepared case to completion
pub async fn run_case(case: &PreparedCase, opts: &RunOptions) -> Result<Outcome> {
    let scratch = ScratchOutput::claim(&case.output)?;

    if let Invocation::Failed(outcome) = invoke(case, &scratch, opts.verbose).await {
        return Ok(outcome);
    }

    let Some(actual) = checksum_if_present(opts.algorithm, scratch.path()).await? else {
        return Ok(Outcome::OutputMissing);
    };
    let Some(expected) = checksum_if_present(opts.algorithm, &case.golden).await? else {
        return Ok(Outcome::GoldenMissing);
    };

    tracing::debug!(case = %case.name, %expected, %actual, "Compared checksums");

    if expected == actual {
        Ok(Outcome::Identical)
    } else {
        Ok(Outcome::Mismatch { expected, actual })
    }
}

/// Load a suite file and prepare the selected cases
pub fn prepare_suite(
    suite_path: &Path,
    config: &Config,
    filter: Option<&str>,
    default_output_flag: &str,
) -> Result<(TestSuite, Vec<PreparedCase>)> {
    let suite = TestSuite::load(suite_path)?;
    let suite_dir = std::fs::canonicalize(paths::suite_dir(suite_path))?;
    let output_flag = suite
        .output_flag
        .clone()
        .unwrap_or_else(|| default_output_flag.to_string());

    // Tools found on PATH are only known after resolution, so outputs are
    // checked against every case's tool here as well as at load time.
    let all: Vec<PreparedCase> = suite
        .cases
        .iter()
        .map(|case| PreparedCase::prepare(case, &suite_dir, &output_flag, config))
        .collect();
    check_outputs_against_tools(suite_path, &all)?;

    let selected: HashSet<&str> = suite
        .select(filter)?
        .into_iter()
        .map(|case| case.name.as_str())
        .collect();
    let prepared = all
        .into_iter()
        .filter(|case| selected.contains(case.name.as_str()))
        .collect();

    Ok((suite, prepared))
}

fn check_outputs_against_tools(suite_path: &Path, cases: &[PreparedCase]) -> Result<()> {
    for case in cases {
        if let Some(owner) = cases.iter().find(|other| other.tool == case.output) {
            return Err(Error::suite_invalid(
                suite_path,
                format!(
                    "case '{}' writes its output over the tool of case '{}' ('{}')",
                    case.name,
                    owner.name,
                    owner.tool.display()
                ),
            ));
        }
    }
    Ok(())
}

/// Run a suite file
pub async fn run_suite(
    suite_path: &Path,
    config: &Config,
    opts: &RunOptions,
) -> Result<SuiteReport> {
    let (suite, cases) =
        prepare_suite(suite_path, config, opts.filter.as_deref(), &opts.output_flag)?;

    let mut summary = SuiteReport::new(suite.display_name(suite_path));
    tracing::info!(
        suite = %summary.suite,
        cases = cases.len(),
        algorithm = %opts.algorithm,
        "Running suite"
    );

    for (i, case) in cases.iter().enumerate() {
        if !opts.quiet {
            report::print_case_header(&case.name, &case.tool_label, &case.input_label);
        }

        let outcome = run_case(case, opts).await?;
        let result = CaseResult {
            name: case.name.clone(),
            golden: case.golden_label.clone(),
            outcome,
        };

        if !opts.quiet {
            report::print_case_result(&result);
        }

        let failed = !result.passed();
        summary.push(result);

        if failed && opts.fail_fast {
            summary.skipped = cases.len() - i - 1;
            break;
        }
    }

    if !opts.quiet {
        report::print_summary(&summary);
    }

    Ok(summary)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Stand-in plotting tool: `plot.sh MODE INPUT -o OUTPUT`
    const FAKE_TOOL: &str = r#"#!/bin/sh
mode="$1"
input="$2"
out="$4"
case "$mode" in
  copy) cp "$input" "$out" ;;
  corrupt) { cat "$input"; printf 'x'; } > "$out" ;;
  crash) exit 3 ;;
  silent) exit 0 ;;
esac
"#;

    const IMAGE: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("plot.sh"), FAKE_TOOL).unwrap();
            fs::write(dir.path().join("plot.in"), IMAGE).unwrap();
            fs::write(dir.path().join("plot.png.out"), IMAGE).unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        /// Write a suite with one case per `(name, mode, golden)`
        fn suite(&self, cases: &[(&str, &str, &str)]) -> PathBuf {
            let mut yaml = String::from("name: fake\ncases:\n");
            for (name, mode, golden) in cases {
                yaml.push_str(&case_yaml(name, mode, &format!("{name}-tmp.png"), golden));
            }
            let path = self.path("suite.yaml");
            fs::write(&path, yaml).unwrap();
            path
        }
    }

    /// One suite entry running `plot.sh MODE`
    fn case_yaml(name: &str, mode: &str, output: &str, golden: &str) -> String {
        format!(
            r#"  - name: {name}
    tool: plot.sh
    interpreter: sh
    args: ["{mode}"]
    input: plot.in
    output: {output}
    golden: {golden}
"#
        )
    }

    fn quiet_options() -> RunOptions {
        RunOptions {
            quiet: true,
            ..RunOptions::from_config(&Config::default())
        }
    }

    async fn outcomes(suite: &Path, opts: &RunOptions) -> Vec<Outcome> {
        run_suite(suite, &Config::default(), opts)
            .await
            .unwrap()
            .results
            .into_iter()
            .map(|r| r.outcome)
            .collect()
    }

    #[tokio::test]
    async fn test_identical_output_passes_and_is_removed() {
        let fx = Fixture::new();
        let suite = fx.suite(&[("hist", "copy", "plot.png.out")]);

        let report = run_suite(&suite, &Config::default(), &quiet_options())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(report.results[0].outcome, Outcome::Identical);
        assert!(!fx.path("hist-tmp.png").exists());
    }

    #[tokio::test]
    async fn test_corrupted_case_fails_alone() {
        let fx = Fixture::new();
        let suite = fx.suite(&[
            ("hist", "corrupt", "plot.png.out"),
            ("scatter", "copy", "plot.png.out"),
        ]);

        let got = outcomes(&suite, &quiet_options()).await;

        assert!(matches!(got[0], Outcome::Mismatch { .. }));
        assert_eq!(got[1], Outcome::Identical);
        assert!(!fx.path("hist-tmp.png").exists());
        assert!(!fx.path("scatter-tmp.png").exists());
    }

    #[tokio::test]
    async fn test_failure_kinds_are_distinguished() {
        let fx = Fixture::new();
        let suite = fx.suite(&[
            ("crash", "crash", "plot.png.out"),
            ("silent", "silent", "plot.png.out"),
            ("nogolden", "copy", "missing.png.out"),
            ("ok", "copy", "plot.png.out"),
        ]);

        let got = outcomes(&suite, &quiet_options()).await;

        assert_eq!(
            got,
            vec![
                Outcome::ToolFailed { exit_code: Some(3) },
                Outcome::OutputMissing,
                Outcome::GoldenMissing,
                Outcome::Identical,
            ]
        );
        assert!(!fx.path("nogolden-tmp.png").exists());
    }

    #[tokio::test]
    async fn test_stale_output_cannot_pass() {
        let fx = Fixture::new();
        let suite = fx.suite(&[("hist", "silent", "plot.png.out")]);
        fs::write(fx.path("hist-tmp.png"), IMAGE).unwrap();

        let got = outcomes(&suite, &quiet_options()).await;

        assert_eq!(got, vec![Outcome::OutputMissing]);
        assert!(!fx.path("hist-tmp.png").exists());
    }

    #[tokio::test]
    async fn test_repeated_runs_agree() {
        let fx = Fixture::new();
        let suite = fx.suite(&[
            ("hist", "copy", "plot.png.out"),
            ("scatter", "corrupt", "plot.png.out"),
        ]);

        let first = outcomes(&suite, &quiet_options()).await;
        let second = outcomes(&suite, &quiet_options()).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_interpreter_is_not_runnable() {
        let fx = Fixture::new();
        let suite = fx.suite(&[("hist", "copy", "plot.png.out")]);
        let yaml = fs::read_to_string(&suite)
            .unwrap()
            .replace("interpreter: sh", "interpreter: golden-plot-no-such-interpreter");
        fs::write(&suite, yaml).unwrap();

        let got = outcomes(&suite, &quiet_options()).await;

        assert!(matches!(got[0], Outcome::ToolNotRunnable { .. }));
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_cases() {
        let fx = Fixture::new();
        let suite = fx.suite(&[
            ("crash", "crash", "plot.png.out"),
            ("hist", "copy", "plot.png.out"),
            ("scatter", "copy", "plot.png.out"),
        ]);
        let opts = RunOptions {
            fail_fast: true,
            ..quiet_options()
        };

        let report = run_suite(&suite, &Config::default(), &opts).await.unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped, 2);
        assert!(!report.success());
    }

    #[tokio::test]
    async fn test_filter_selects_cases() {
        let fx = Fixture::new();
        let suite = fx.suite(&[
            ("hist", "crash", "plot.png.out"),
            ("scatter", "copy", "plot.png.out"),
        ]);
        let opts = RunOptions {
            filter: Some("scat".to_string()),
            ..quiet_options()
        };

        let report = run_suite(&suite, &Config::default(), &opts).await.unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].name, "scatter");
        assert!(report.success());
    }

    #[test]
    fn test_prepared_command_line_order() {
        let fx = Fixture::new();
        let suite = fx.suite(&[("hist", "copy", "plot.png.out")]);
        let (_, cases) = prepare_suite(&suite, &Config::default(), None, "-o").unwrap();

        let case = &cases[0];
        assert_eq!(case.program, OsString::from("sh"));
        let args: Vec<String> = case
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args[0].ends_with("plot.sh"));
        assert_eq!(args[1], "copy");
        assert!(args[2].ends_with("plot.in"));
        assert_eq!(args[3], "-o");
        assert!(args[4].ends_with("hist-tmp.png"));
    }

    #[tokio::test]
    async fn test_unreadable_golden_aborts_after_cleanup() {
        let fx = Fixture::new();
        // A directory cannot be read as a file, even by root.
        fs::create_dir(fx.path("dir.png.out")).unwrap();
        let suite = fx.suite(&[
            ("hist", "copy", "dir.png.out"),
            ("scatter", "copy", "plot.png.out"),
        ]);

        let err = run_suite(&suite, &Config::default(), &quiet_options())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChecksumIo { .. }));
        assert!(!fx.path("hist-tmp.png").exists());
        assert!(!fx.path("scatter-tmp.png").exists());
    }

    #[tokio::test]
    async fn test_aliased_outputs_never_touch_checked_in_files() {
        let fx = Fixture::new();
        fs::write(fx.path("a.png.out"), IMAGE).unwrap();
        fs::write(fx.path("b.png.out"), IMAGE).unwrap();

        let suites = [
            case_yaml("a", "copy", "./a.png.out", "a.png.out"),
            case_yaml("b", "copy", "b-tmp.png", "b.png.out")
                + &case_yaml("c", "copy", "b.png.out", "plot.png.out"),
        ];

        for cases in suites {
            let suite = fx.path("suite.yaml");
            fs::write(&suite, format!("cases:\n{cases}")).unwrap();

            let err = run_suite(&suite, &Config::default(), &quiet_options())
                .await
                .unwrap_err();

            assert!(matches!(err, Error::SuiteInvalid { .. }));
            assert!(fx.path("a.png.out").exists());
            assert!(fx.path("b.png.out").exists());
        }
    }

    #[test]
    fn test_output_over_tool_found_on_path_is_rejected() {
        let fx = Fixture::new();
        let sh = which::which("sh").unwrap();
        let suite = fx.path("suite.yaml");
        fs::write(
            &suite,
            format!(
                r#"cases:
  - name: hist
    tool: sh
    input: plot.in
    output: {}
    golden: plot.png.out
"#,
                sh.display()
            ),
        )
        .unwrap();

        let err = prepare_suite(&suite, &Config::default(), None, "-o").unwrap_err();

        assert!(err.to_string().contains("the tool of case 'hist'"));
        assert!(sh.exists());
    }

    #[test]
    fn test_scratch_output_removed_on_drop() {
        let fx = Fixture::new();
        let path = fx.path("scratch.png");
        fs::write(&path, b"stale").unwrap();

        let scratch = ScratchOutput::claim(&path).unwrap();
        assert!(!path.exists());
        fs::write(scratch.path(), b"fresh").unwrap();
        drop(scratch);

        assert!(!path.exists());
    }
}

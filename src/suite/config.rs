//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML suite files. A suite is
//! an ordered registry of test cases; adding a case is a data change only.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::common::{paths, Error, Result};

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TestSuite {
    /// Name of the suite
    pub name: Option<String>,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Flag preceding the output path; overrides the configured default
    pub output_flag: Option<String>,
    /// Test cases, run in this order
    pub cases: Vec<TestCase>,
}

/// A single golden-file comparison
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Label printed for this case; unique within the suite
    pub name: String,
    /// Optional description of what the case exercises
    pub description: Option<String>,
    /// Tool to run, relative to the suite directory or looked up on PATH
    pub tool: PathBuf,
    /// Fixed tool arguments placed before the fixture input
    #[serde(default)]
    pub args: Vec<String>,
    /// Fixture input file
    pub input: PathBuf,
    /// Path the tool writes to; removed after every run
    pub output: PathBuf,
    /// Checked-in reference artifact
    pub golden: PathBuf,
    /// Interpreter to run the tool with (e.g. "python3")
    pub interpreter: Option<String>,
}

impl TestSuite {
    /// Load and validate a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::SuiteRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    /// Parse and validate suite text; `path` is only used in error messages
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let suite: TestSuite = serde_yaml::from_str(content).map_err(|e| Error::SuiteParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        suite.validate(path)?;
        Ok(suite)
    }

    /// Display name: the declared name, or the file stem
    pub fn display_name(&self, path: &Path) -> String {
        self.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "suite".to_string())
        })
    }

    /// Cases whose name contains `filter`, in registration order
    pub fn select(&self, filter: Option<&str>) -> Result<Vec<&TestCase>> {
        let selected: Vec<&TestCase> = self
            .cases
            .iter()
            .filter(|case| filter.map_or(true, |f| case.name.contains(f)))
            .collect();

        match filter {
            Some(f) if selected.is_empty() => Err(Error::NoMatchingCases(f.to_string())),
            _ => Ok(selected),
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.cases.is_empty() {
            return Err(Error::suite_invalid(path, "suite has no test cases"));
        }

        if let Some(flag) = &self.output_flag {
            if flag.trim().is_empty() {
                return Err(Error::suite_invalid(path, "output_flag must not be empty"));
            }
        }

        let mut names = HashSet::new();
        for case in &self.cases {
            case.validate(path)?;

            if !names.insert(case.name.as_str()) {
                return Err(Error::suite_invalid(
                    path,
                    format!("duplicate case name '{}'", case.name),
                ));
            }
        }

        self.validate_outputs(path)
    }

    /// Every output is deleted after its case runs, so no output may alias a
    /// checked-in file of any case, a tool, the suite itself, or another output.
    fn validate_outputs(&self, path: &Path) -> Result<()> {
        let base = paths::suite_dir(path);

        let mut protected: HashMap<PathBuf, String> = HashMap::new();
        protected.insert(paths::normalize(path), "the suite file".to_string());
        for case in &self.cases {
            let files = [
                ("input", &case.input),
                ("golden", &case.golden),
                ("tool", &case.tool),
            ];
            for (field, file) in files {
                protected
                    .entry(paths::resolve(&base, file))
                    .or_insert_with(|| format!("the {} of case '{}'", field, case.name));
            }
        }

        let mut outputs = HashSet::new();
        for case in &self.cases {
            let output = paths::resolve(&base, &case.output);

            if let Some(owner) = protected.get(&output) {
                return Err(Error::suite_invalid(
                    path,
                    format!(
                        "case '{}' writes its output over a checked-in file '{}' ({})",
                        case.name,
                        case.output.display(),
                        owner
                    ),
                ));
            }
            if !outputs.insert(output) {
                return Err(Error::suite_invalid(
                    path,
                    format!(
                        "case '{}' shares output path '{}' with an earlier case",
                        case.name,
                        case.output.display()
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl TestCase {
    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::suite_invalid(path, "case with empty name"));
        }

        let fields = [
            ("tool", &self.tool),
            ("input", &self.input),
            ("output", &self.output),
            ("golden", &self.golden),
        ];
        for (field, value) in fields {
            if value.as_os_str().is_empty() {
                return Err(Error::suite_invalid(
                    path,
                    format!("case '{}' has an empty '{}'", self.name, field),
                ));
            }
        }

        Ok(())
    }
}

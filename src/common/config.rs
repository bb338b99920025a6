//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::paths::config_path;
use super::Result;
use crate::checksum::Algorithm;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Checksum settings
    #[serde(default)]
    pub checksum: ChecksumConfig,

    /// Runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Interpreters keyed by tool file extension (e.g. `py = "python3"`)
    #[serde(default)]
    pub interpreters: HashMap<String, String>,
}

/// Checksum settings
#[derive(Debug, Deserialize, Default)]
pub struct ChecksumConfig {
    /// Algorithm used when none is given on the command line
    #[serde(default)]
    pub algorithm: Algorithm,
}

/// Runner settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Flag that precedes the generated-output path on the tool command line
    #[serde(default = "default_output_flag")]
    pub output_flag: String,

    /// Stop after the first failing case
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_flag: default_output_flag(),
            fail_fast: false,
        }
    }
}

fn default_output_flag() -> String {
    "-o".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::Error::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.runner.output_flag.trim().is_empty() {
            return Err(super::Error::ConfigParse(
                "runner.output_flag must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Interpreter configured for the tool's file extension, if any
    pub fn interpreter_for(&self, tool: &Path) -> Option<&str> {
        let ext = tool.extension()?.to_str()?;
        self.interpreters.get(ext).map(String::as_str)
    }
}

//! Error types for the golden-plot runner
//!
//! Per-case conditions (tool crashed, output missing, checksum mismatch) are
//! not errors; they are reported as outcomes by the runner. The variants here
//! cover everything that stops a run as a whole.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the golden-plot runner
#[derive(Error, Debug)]
pub enum Error {
    // === Suite Errors ===
    #[error("Failed to read suite '{path}': {source}")]
    SuiteRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse suite '{path}': {message}")]
    SuiteParse { path: PathBuf, message: String },

    #[error("Invalid suite '{path}': {message}")]
    SuiteInvalid { path: PathBuf, message: String },

    #[error("No test case in the suite matches filter '{0}'")]
    NoMatchingCases(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Artifact Errors ===
    #[error("Failed to checksum '{path}': {source}")]
    ChecksumIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove generated output '{path}': {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to update golden file '{path}': {source}")]
    Bless {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a suite validation error
    pub fn suite_invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::SuiteInvalid {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a checksum error for the file at `path`
    pub fn checksum_io(path: &Path, source: io::Error) -> Self {
        Self::ChecksumIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

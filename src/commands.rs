//! CLI command definitions
//!
//! Defines the clap commands for the golden-plot CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::checksum::Algorithm;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a suite and compare every generated image with its golden file
    Run {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Only run cases whose name contains this text
        #[arg(long, short)]
        filter: Option<String>,

        /// Stop after the first failing case
        #[arg(long, overrides_with = "no_fail_fast")]
        fail_fast: bool,

        /// Run every case even when the config enables fail-fast
        #[arg(long, overrides_with = "fail_fast")]
        no_fail_fast: bool,

        /// Checksum algorithm (default from config, else sha256)
        #[arg(long, value_enum)]
        algorithm: Option<Algorithm>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Show tool command lines and tool output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List the cases registered in a suite
    #[command(alias = "ls")]
    List {
        /// Path to the YAML suite file
        suite: PathBuf,
    },

    /// Regenerate golden files from the current tool output
    Bless {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Only bless cases whose name contains this text
        #[arg(long, short)]
        filter: Option<String>,

        /// Show tool command lines and tool output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print the checksum of one or more files
    #[command(alias = "cksum")]
    Checksum {
        /// Files to checksum
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Checksum algorithm (default from config, else sha256)
        #[arg(long, value_enum)]
        algorithm: Option<Algorithm>,
    },
}

impl Commands {
    /// Whether the command asked for verbose output
    pub fn verbose(&self) -> bool {
        match self {
            Commands::Run { verbose, .. } | Commands::Bless { verbose, .. } => *verbose,
            _ => false,
        }
    }
}

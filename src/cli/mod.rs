//! CLI command handling
//!
//! Dispatches CLI commands to the suite runner and formats output.

use colored::Colorize;

use crate::checksum::Checksum;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::suite::{self, RunOptions};

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when the command ran but something under test failed.
pub async fn dispatch(command: Commands) -> Result<bool> {
    let config = Config::load()?;

    match command {
        Commands::Run {
            suite,
            filter,
            fail_fast,
            no_fail_fast,
            algorithm,
            json,
            verbose,
        } => {
            let defaults = RunOptions::from_config(&config);
            let opts = RunOptions {
                filter,
                fail_fast: resolve_fail_fast(fail_fast, no_fail_fast, defaults.fail_fast),
                algorithm: algorithm.unwrap_or(defaults.algorithm),
                // Tool output would corrupt the JSON document on stdout
                verbose: verbose && !json,
                quiet: json,
                ..defaults
            };

            let report = suite::run_suite(&suite, &config, &opts).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            Ok(report.success())
        }

        Commands::List { suite } => {
            let defaults = RunOptions::from_config(&config);
            let (loaded, cases) =
                suite::prepare_suite(&suite, &config, None, &defaults.output_flag)?;

            println!("{}", loaded.display_name(&suite).white().bold());
            if let Some(desc) = &loaded.description {
                println!("  {}", desc.dimmed());
            }
            for (case, registered) in cases.iter().zip(&loaded.cases) {
                println!("\n  {}", case.name.bold());
                if let Some(desc) = &registered.description {
                    println!("    {}", desc.dimmed());
                }
                println!("    $ {}", case.command_line());
                println!("    golden: {}", case.golden_label.display());
            }

            Ok(true)
        }

        Commands::Bless {
            suite,
            filter,
            verbose,
        } => {
            let opts = RunOptions {
                filter,
                verbose,
                ..RunOptions::from_config(&config)
            };
            suite::bless_suite(&suite, &config, &opts).await
        }

        Commands::Checksum { files, algorithm } => {
            let algorithm = algorithm.unwrap_or(config.checksum.algorithm);
            for path in &files {
                let sum = Checksum::of_file(algorithm, path)
                    .await
                    .map_err(|e| Error::checksum_io(path, e))?;
                println!("{}  {}", sum, path.display());
            }
            Ok(true)
        }
    }
}

/// Command-line flags win over `[runner] fail_fast`; clap keeps only the last flag given
fn resolve_fail_fast(fail_fast: bool, no_fail_fast: bool, configured: bool) -> bool {
    if no_fail_fast {
        false
    } else {
        fail_fast || configured
    }
}

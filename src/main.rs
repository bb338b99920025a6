//! golden-plot - golden-file regression runner for plotting tools
//!
//! Exit status: 0 when everything passed, 1 when a case failed, 2 when the
//! run itself could not be carried out.

use clap::Parser;
use golden_plot::{cli, commands, common::logging};
use commands::Commands;

#[derive(Parser)]
#[command(name = "golden-plot", about = "Golden-file regression runner for plotting tools")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

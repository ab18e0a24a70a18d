// fitenc-cli/src/main.rs
//
// Entry point of the fitenc binary.
//
// Order of a run:
// - parse arguments (clap exits with 2 on usage errors)
// - build and validate the core configuration (exit 2 on failure)
// - set up console and file logging
// - encode every input and print the summary
// - exit 0 when every input converged, 1 on any failure, 130 on Ctrl-C

use clap::Parser;
use console::style;
use fitenc_cli::{Cli, build_config, exit_code_for_error, exit_code_for_report, logging, run_encode};
use std::process;

fn main() {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            process::exit(exit_code_for_error(&e));
        }
    };

    let log_path = match logging::init_logging(&cli.effective_log_dir(), cli.verbose) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            process::exit(exit_code_for_error(&e));
        }
    };

    match run_encode(&cli, &config, &log_path) {
        Ok(report) => process::exit(exit_code_for_report(&report)),
        Err(e) => {
            log::error!("Error: {e}");
            process::exit(exit_code_for_error(&e));
        }
    }
}

// fitenc-cli/src/lib.rs
//
// Library portion of the fitenc CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::Cli;
pub use commands::encode::{build_config, run_encode};
pub use error::{CliResult, exit_code_for_error, exit_code_for_report};

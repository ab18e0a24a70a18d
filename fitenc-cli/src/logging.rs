// ============================================================================
// fitenc-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and run log file
//
// The core library and the CLI both log through the `log` facade. This module
// installs a fern dispatcher with two outputs:
//
// - the console (stderr), colored by level through `console`, at info or at
//   debug with --verbose
// - a plain-text run log `fitenc_run_<YYYYMMDD_HHMMSS>.log` in the log
//   directory, always at debug, with timestamps and ANSI codes stripped

use crate::error::{CliErrorContext, CliResult};

use console::style;
use log::{Level, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// File name of the run log started now.
pub fn run_log_file_name() -> String {
    format!("fitenc_run_{}.log", get_timestamp())
}

fn console_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn styled_console_line(level: Level, message: &str) -> String {
    match level {
        Level::Error => style(message).red().bold().to_string(),
        Level::Warn => style(message).yellow().to_string(),
        Level::Info => message.to_string(),
        Level::Debug | Level::Trace => style(message).dim().to_string(),
    }
}

/// Installs the global logger and returns the path of the run log.
pub fn init_logging(log_dir: &Path, verbose: bool) -> CliResult<PathBuf> {
    fs::create_dir_all(log_dir)
        .cli_with_context(|| format!("Failed to create log directory '{}'", log_dir.display()))?;
    let log_path = log_dir.join(run_log_file_name());
    let log_file = fern::log_file(&log_path)
        .cli_with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;

    let console = fern::Dispatch::new()
        .level(console_level(verbose))
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                styled_console_line(record.level(), &message.to_string())
            ));
        })
        .chain(std::io::stderr());

    let file = fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                console::strip_ansi_codes(&message.to_string())
            ));
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .level_for("ffmpeg_sidecar", LevelFilter::Warn)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(|e| fitenc_core::CoreError::OperationFailed(format!("Failed to install logger: {e}")))?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_file_name() {
        let name = run_log_file_name();
        assert!(name.starts_with("fitenc_run_"));
        assert!(name.ends_with(".log"));
        // fitenc_run_ + YYYYMMDD_HHMMSS + .log
        assert_eq!(name.len(), 11 + 15 + 4);
    }

    #[test]
    fn test_console_levels() {
        assert_eq!(console_level(false), LevelFilter::Info);
        assert_eq!(console_level(true), LevelFilter::Debug);
    }

    #[test]
    fn test_info_lines_are_unstyled() {
        assert_eq!(styled_console_line(Level::Info, "plain"), "plain");
        let warn = styled_console_line(Level::Warn, "careful");
        assert_eq!(console::strip_ansi_codes(&warn), "careful");
    }
}

// ============================================================================
// fitenc-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// This module provides error handling utilities for the CLI that integrate
// with the fitenc-core error types while adding CLI-specific error contexts,
// and maps errors and batch results onto process exit codes.
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - CliErrorContext: anyhow-style context methods producing CoreError
// - Exit codes: 0 converged, 1 failure, 2 usage/configuration, 130 interrupted

// ---- Internal crate imports ----
use fitenc_core::{BatchReport, CoreError, CoreResult};

// ---- Standard library imports ----
use std::fmt;

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

// ============================================================================
// EXIT CODES
// ============================================================================

/// Every input converged inside its size window.
pub const EXIT_SUCCESS: i32 = 0;

/// At least one input failed or did not converge.
pub const EXIT_FAILURE: i32 = 1;

/// Invalid command line or configuration.
pub const EXIT_USAGE: i32 = 2;

/// The run was interrupted with Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit code for a finished batch.
#[must_use]
pub fn exit_code_for_report(report: &BatchReport) -> i32 {
    if report.interrupted {
        EXIT_INTERRUPTED
    } else if report.has_failures() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Exit code for an error that stopped the run.
#[must_use]
pub fn exit_code_for_error(error: &CoreError) -> i32 {
    match error {
        CoreError::Config(_) => EXIT_USAGE,
        CoreError::Interrupted => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

// ============================================================================
// ERROR CONVERSION UTILITIES
// ============================================================================

/// Extension trait for adding context to errors in the CLI.
///
/// This trait provides methods similar to anyhow's context methods
/// but converts to CoreError instead.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{context}: {core_error}"))
        })
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {core_error}", f()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitenc_core::{FileOutcome, FileReport};
    use std::path::PathBuf;
    use std::time::Duration;

    fn file(outcome: FileOutcome) -> FileReport {
        FileReport {
            input: PathBuf::from("a.mkv"),
            outcome,
            attempts: 1,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_report_exit_codes() {
        let mut report = BatchReport::default();
        assert_eq!(exit_code_for_report(&report), EXIT_SUCCESS);

        report.files.push(file(FileOutcome::Success { path: None, bytes: 1 }));
        assert_eq!(exit_code_for_report(&report), EXIT_SUCCESS);

        report.files.push(file(FileOutcome::TooLarge));
        assert_eq!(exit_code_for_report(&report), EXIT_FAILURE);

        report.interrupted = true;
        assert_eq!(exit_code_for_report(&report), EXIT_INTERRUPTED);
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(exit_code_for_error(&CoreError::Config("x".into())), EXIT_USAGE);
        assert_eq!(exit_code_for_error(&CoreError::Interrupted), EXIT_INTERRUPTED);
        assert_eq!(
            exit_code_for_error(&CoreError::DependencyNotFound("ffmpeg".into())),
            EXIT_FAILURE
        );
    }

    #[test]
    fn test_context_wraps_message() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.cli_context("Failed to open log file").unwrap_err();
        assert!(err.to_string().contains("Failed to open log file"));
        assert!(err.to_string().contains("gone"));
    }
}

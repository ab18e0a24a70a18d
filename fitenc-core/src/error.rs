// ============================================================================
// fitenc-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for fitenc-core
//
// This module defines the error types used throughout the fitenc-core library.
// It uses thiserror for the Display/Error boilerplate and exposes a few helper
// constructors for failures of the external ffmpeg/ffprobe processes.
//
// KEY COMPONENTS:
// - CoreError: Enum of every error the library can surface
// - CoreResult: Result alias using CoreError
// - Helper functions for command start/wait/exit failures
//
// ERROR CATEGORIES:
// - Configuration: invalid or conflicting settings (fatal before any input)
// - Probe: unreadable input or unsupported stream layout (input skipped)
// - Command: the encoder or prober could not start or exited non-zero
//   (input aborted, batch continues)
// - Interrupted: the user asked to stop (batch aborted)

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the fitenc-core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Required dependency '{0}' not found or failed to execute")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("ffprobe output parsing error: {0}")]
    FfprobeParse(String),

    #[error("Unsupported media: {0}")]
    VideoInfoError(String),

    #[error("Invalid trim window: {0}")]
    InvalidTrim(String),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl CoreError {
    /// True for failures of the external encoder process itself, as opposed
    /// to probing problems or an unreachable size target.
    #[must_use]
    pub fn is_encoder_failure(&self) -> bool {
        matches!(
            self,
            CoreError::CommandStart(..) | CoreError::CommandWait(..) | CoreError::CommandFailed(..)
        )
    }
}

/// Result type alias used throughout the library.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for a process that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a [`CoreError::CommandWait`] for a process whose exit could not be collected.
pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds a [`CoreError::CommandFailed`] for a process that exited unsuccessfully.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_failure_classification() {
        let start = command_start_error("ffmpeg", io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(start.is_encoder_failure());

        let failed = command_failed_error("ffmpeg", ExitStatus::default(), "boom");
        assert!(failed.is_encoder_failure());
        assert!(failed.to_string().contains("boom"));

        assert!(!CoreError::Interrupted.is_encoder_failure());
        assert!(!CoreError::FfprobeParse("bad".into()).is_encoder_failure());
    }
}

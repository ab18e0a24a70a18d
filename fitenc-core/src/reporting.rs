//! Per-file outcomes and the batch summary.

use crate::utils::format_bytes;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How processing one input ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Output landed inside the size window.
    Success { path: Option<PathBuf>, bytes: u64 },
    /// No mode produced an output under the limit.
    TooLarge,
    /// Output stayed below the lower bound; the largest fitting one was kept.
    TooSmall { path: Option<PathBuf>, bytes: u64 },
    ProbeFailed { reason: String },
    EncodeFailed { reason: String },
    Interrupted,
}

impl FileOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Success { bytes, .. } => write!(f, "done ({})", format_bytes(*bytes)),
            FileOutcome::TooLarge => write!(f, "too large: no attempt fit under the limit"),
            FileOutcome::TooSmall { bytes, .. } => {
                write!(f, "too small: best attempt kept ({})", format_bytes(*bytes))
            }
            FileOutcome::ProbeFailed { reason } => write!(f, "probe failed: {reason}"),
            FileOutcome::EncodeFailed { reason } => write!(f, "encode failed: {reason}"),
            FileOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Record of one processed input.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub outcome: FileOutcome,
    /// Encode attempts made (test encodes excluded).
    pub attempts: usize,
    pub elapsed: Duration,
}

/// Outcomes of a whole batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub interrupted: bool,
}

impl BatchReport {
    /// True if any input did not converge inside the window.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| !f.outcome.is_success())
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    /// One human-readable line per input.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|f| {
                let name = f
                    .input
                    .file_name()
                    .map_or_else(|| f.input.display().to_string(), |n| n.to_string_lossy().into_owned());
                format!("{name}: {} [{} attempt(s), {:.1}s]", f.outcome, f.attempts, f.elapsed.as_secs_f64())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: FileOutcome) -> FileReport {
        FileReport {
            input: PathBuf::from("/in/clip.mkv"),
            outcome,
            attempts: 2,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_failures_and_summary() {
        let mut batch = BatchReport::default();
        batch.files.push(report(FileOutcome::Success { path: None, bytes: 2048 }));
        assert!(!batch.has_failures());

        batch.files.push(report(FileOutcome::TooLarge));
        assert!(batch.has_failures());
        assert_eq!(batch.success_count(), 1);

        let lines = batch.summary_lines();
        assert_eq!(lines[0], "clip.mkv: done (2.00 KiB) [2 attempt(s), 1.5s]");
        assert!(lines[1].starts_with("clip.mkv: too large"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(FileOutcome::ProbeFailed { reason: "bad".into() }).unwrap();
        assert_eq!(json["status"], "probe_failed");
        assert_eq!(json["reason"], "bad");
    }
}

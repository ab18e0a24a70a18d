// ============================================================================
// fitenc-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Sections, status lines and the batch summary
//
// Everything goes through the `log` facade at info level so the same lines
// reach the console and the run log. Styling uses `console`, which drops the
// escape codes when stderr is not a terminal; the file logger strips them.

use console::style;
use fitenc_core::{BatchReport, FileOutcome, format_bytes};
use log::info;

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const WARNING_SYMBOL: &str = "!";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";

    /// Status labels are padded to this width.
    pub const LABEL_WIDTH: usize = 15;
}

/// Print a section header for major workflow phases
pub fn print_section(title: &str) {
    info!("");
    info!(
        "{}{}{}",
        styling::SECTION_PREFIX,
        style(title.to_uppercase()).cyan().bold(),
        styling::SECTION_SUFFIX
    );
}

/// Formats a `label: value` status line.
#[must_use]
pub fn format_status(label: &str, value: &str) -> String {
    let padding = styling::LABEL_WIDTH.saturating_sub(label.len()).max(1);
    format!("{}{label}:{}{value}", styling::STATUS_INDENT, " ".repeat(padding))
}

/// Print a status line (key-value pair)
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if highlight {
        info!("{}", format_status(label, &style(value).bold().to_string()));
    } else {
        info!("{}", format_status(label, value));
    }
}

pub fn print_success(message: &str) {
    info!("{}{} {}", styling::STATUS_INDENT, styling::SUCCESS_SYMBOL, message);
}

pub fn print_processing(message: &str) {
    info!("{}{} {}", styling::STATUS_INDENT, styling::PROCESSING_SYMBOL, style(message).bold());
}

/// Print an error message with an optional suggestion.
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    info!("{} {}", styling::ERROR_SYMBOL, style(title).red().bold());
    info!("  Message:  {message}");
    if let Some(suggestion) = suggestion {
        info!("  Suggestion: {suggestion}");
    }
}

fn outcome_symbol(outcome: &FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::Success { .. } => styling::SUCCESS_SYMBOL,
        FileOutcome::TooSmall { .. } | FileOutcome::Interrupted => styling::WARNING_SYMBOL,
        _ => styling::ERROR_SYMBOL,
    }
}

/// Prints the per-input outcomes and the totals.
pub fn print_batch_summary(report: &BatchReport) {
    print_section("Summary");
    for (file, line) in report.files.iter().zip(report.summary_lines()) {
        let symbol = outcome_symbol(&file.outcome);
        let line = if file.outcome.is_success() {
            line
        } else {
            style(line).yellow().to_string()
        };
        info!("{}{symbol} {line}", styling::STATUS_INDENT);
    }

    let converged_bytes: u64 = report
        .files
        .iter()
        .filter_map(|f| match f.outcome {
            FileOutcome::Success { bytes, .. } => Some(bytes),
            _ => None,
        })
        .sum();

    info!("");
    print_status(
        "Converged",
        &format!("{} of {}", report.success_count(), report.files.len()),
        true,
    );
    print_status("Output total", &format_bytes(converged_bytes), false);
    if report.interrupted {
        print_status("Status", "interrupted", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_padding() {
        assert_eq!(format_status("Input", "a.mkv"), "  Input:          a.mkv");
        let long = format_status("An unusually long label", "x");
        assert!(long.ends_with("label: x"));
    }

    #[test]
    fn test_outcome_symbols() {
        assert_eq!(
            outcome_symbol(&FileOutcome::Success { path: None, bytes: 1 }),
            styling::SUCCESS_SYMBOL
        );
        assert_eq!(outcome_symbol(&FileOutcome::TooLarge), styling::ERROR_SYMBOL);
        assert_eq!(
            outcome_symbol(&FileOutcome::TooSmall { path: None, bytes: 1 }),
            styling::WARNING_SYMBOL
        );
    }
}

//! Utility functions for formatting and path handling.

use std::path::{Path, PathBuf};

/// Formats milliseconds as HH:MM:SS.mmm (e.g. 3725250 -> "01:02:05.250").
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}.{:03}", ms % 1000)
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Safely extracts filename from a path with consistent error handling.
pub fn get_filename_safe(path: &Path) -> crate::CoreResult<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| {
            crate::CoreError::PathError(format!("Failed to get filename for {}", path.display()))
        })?
        .to_string_lossy()
        .to_string())
}

/// Output path for an input: `<output_dir>/<input stem>.webm`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> crate::CoreResult<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        crate::CoreError::PathError(format!("Failed to get file stem for {}", input.display()))
    })?;
    let mut name = stem.to_os_string();
    name.push(".webm");
    Ok(output_dir.join(name))
}

//! Temporary file management utilities.
//!
//! Every input gets its own workspace directory holding pass logs, attempt
//! outputs and test-encode scratch files. It relies on the tempfile crate so
//! the workspace is removed on drop, including when an input is aborted.

use crate::config::CoreConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};

/// Prefix of per-input workspace directories.
pub const WORKSPACE_PREFIX: &str = "fitenc_";

/// Creates a uniquely named workspace directory. Auto-cleaned when dropped.
///
/// The workspace lives in `config.temp_dir`, or in the output directory when
/// none is configured, so finished attempts can be renamed into place.
pub fn create_temp_dir(config: &CoreConfig, prefix: &str) -> CoreResult<TempDir> {
    let temp_base_dir = config.temp_dir.as_ref().unwrap_or(&config.output_dir);
    std::fs::create_dir_all(temp_base_dir)?;

    Ok(TempFileBuilder::new()
        .prefix(prefix)
        .tempdir_in(temp_base_dir)?)
}

/// Returns a temporary file path with random suffix. Does not create the file.
pub fn create_temp_file_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    use rand::distributions::Alphanumeric;
    use rand::{Rng, thread_rng};

    let random_suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    let filename = format!("{prefix}_{random_suffix}.{extension}");
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_workspace_is_removed_on_drop() -> Result<(), Box<dyn std::error::Error>> {
        let base = tempdir()?;
        let config = CoreConfig {
            output_dir: base.path().join("out"),
            ..Default::default()
        };

        let workspace = create_temp_dir(&config, WORKSPACE_PREFIX)?;
        let path = workspace.path().to_path_buf();
        assert!(path.starts_with(base.path().join("out")));
        assert!(path.is_dir());

        drop(workspace);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_temp_file_paths_are_unique() {
        let dir = Path::new("/tmp/ws");
        let a = create_temp_file_path(dir, "copy_test", "mkv");
        let b = create_temp_file_path(dir, "copy_test", "mkv");
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mkv"));
        assert!(a.starts_with(dir));
    }
}

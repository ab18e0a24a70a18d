use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn fitenc_cmd() -> Command {
    Command::cargo_bin("fitenc").expect("Failed to find fitenc binary")
}

#[test]
fn test_help_lists_main_options() {
    fitenc_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--size-limit"))
        .stdout(contains("--undershoot"))
        .stdout(contains("--output-dir"));
}

#[test]
fn test_missing_input_is_a_usage_error() {
    fitenc_cmd().assert().code(2);
}

#[test]
fn test_invalid_undershoot_exits_with_usage_code() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    fitenc_cmd()
        .arg("clip.mp4")
        .arg("--output-dir")
        .arg(out.path())
        .arg("--undershoot")
        .arg("1.5")
        .assert()
        .code(2)
        .stderr(contains("undershoot"));

    // Nothing is written for a rejected configuration
    assert!(!out.path().join("logs").exists());
    Ok(())
}

#[test]
fn test_conflicting_trim_exits_with_usage_code() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    fitenc_cmd()
        .arg("clip.mp4")
        .arg("--output-dir")
        .arg(out.path())
        .args(["--start", "30", "--end", "10"])
        .assert()
        .code(2)
        .stderr(contains("end"));
    Ok(())
}

#[test]
fn test_unknown_codec_is_rejected_by_parser() {
    fitenc_cmd()
        .args(["clip.mp4", "--video-codec", "av1"])
        .assert()
        .code(2)
        .stderr(contains("av1"));
}

#[test]
fn test_non_existent_input_fails() -> Result<(), Box<dyn Error>> {
    let out = tempdir()?;
    // Fails either at the dependency check or when probing the input
    fitenc_cmd()
        .arg("surely/this/does/not/exist/input.mkv")
        .arg("--output-dir")
        .arg(out.path())
        .assert()
        .failure();

    // The run log is created before any input is touched
    let logs: Vec<_> = std::fs::read_dir(out.path().join("logs"))?.collect::<Result<_, _>>()?;
    assert_eq!(logs.len(), 1);
    assert!(logs[0].file_name().to_string_lossy().starts_with("fitenc_run_"));
    Ok(())
}

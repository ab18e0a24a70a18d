// fitenc-core/tests/utils_tests.rs

use fitenc_core::processing::media_info::{FrameRate, TrimWindow, format_seconds, seconds_to_ms};
use fitenc_core::utils::{get_filename_safe, output_path_for};
use fitenc_core::{CoreError, format_bytes, format_duration_ms};
use std::path::{Path, PathBuf};

#[test]
fn test_format_duration_ms() {
    assert_eq!(format_duration_ms(0), "00:00:00.000");
    assert_eq!(format_duration_ms(1), "00:00:00.001");
    assert_eq!(format_duration_ms(61_500), "00:01:01.500");
    assert_eq!(format_duration_ms(3_600_000), "01:00:00.000");
}

#[test]
fn test_format_bytes() {
    assert_eq!(format_bytes(0), "0 B");
    assert_eq!(format_bytes(1023), "1023 B");
    assert_eq!(format_bytes(1024), "1.00 KiB");
    assert_eq!(format_bytes(1024 * 1024 - 1), "1024.00 KiB"); // Check rounding
    assert_eq!(format_bytes(1024 * 1024), "1.00 MiB");
    assert_eq!(format_bytes(3_145_728), "3.00 MiB");
}

#[test]
fn test_paths() {
    assert_eq!(get_filename_safe(Path::new("a/b/c.mkv")).unwrap(), "c.mkv");
    assert!(matches!(
        get_filename_safe(Path::new("/")),
        Err(CoreError::PathError(_))
    ));
    assert_eq!(
        output_path_for(Path::new("/videos/talk.mov"), Path::new("/done")).unwrap(),
        PathBuf::from("/done/talk.webm")
    );
}

#[test]
fn test_frame_rate_parsing() {
    assert_eq!(FrameRate::parse("30000/1001"), Some(FrameRate::new(30000, 1001)));
    assert_eq!(FrameRate::parse("25"), Some(FrameRate::new(25, 1)));
    assert_eq!(FrameRate::parse("0/0"), None);
    assert_eq!(FrameRate::parse("abc"), None);
    assert_eq!(FrameRate::new(30000, 1001).to_string(), "30000/1001");
    assert_eq!(FrameRate::from_f64(23.976).to_string(), "23976/1000");
}

#[test]
fn test_trim_window_resolution() {
    assert_eq!(TrimWindow::resolve(None, None, 60_000).unwrap(), None);

    let window = TrimWindow::resolve(Some(10.0), Some(20.5), 60_000).unwrap().unwrap();
    assert_eq!(window.duration_ms(), 10_500);

    let open_end = TrimWindow::resolve(Some(50.0), None, 60_000).unwrap().unwrap();
    assert_eq!(open_end.duration_ms(), 10_000);

    assert!(matches!(
        TrimWindow::resolve(Some(60.0), None, 60_000),
        Err(CoreError::InvalidTrim(_))
    ));
    assert!(TrimWindow::resolve(None, Some(61.0), 60_000).is_err());

    assert_eq!(seconds_to_ms(1.25), 1250);
    assert_eq!(format_seconds(1_500), "1.500");
}

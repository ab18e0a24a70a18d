//! FFprobe integration for media analysis.
//!
//! Provides the [`FfprobeExecutor`] seam used by the batch orchestration and
//! the test encoder, and its production implementation backed by the
//! `ffprobe` crate.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::processing::media_info::{AudioStreamInfo, FrameRate, MediaInfo};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Trait for media probing.
pub trait FfprobeExecutor {
    /// Probes an input for duration, picture geometry and audio streams.
    ///
    /// The first stream must be a video stream. A missing container duration
    /// is reported as `duration_ms: None` rather than an error.
    fn probe_media(&self, input_path: &Path) -> CoreResult<MediaInfo>;

    /// Probes only the duration of a file, in milliseconds.
    fn probe_duration(&self, input_path: &Path) -> CoreResult<Option<u64>>;
}

/// Concrete implementation of [`FfprobeExecutor`] using the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe_media(&self, input_path: &Path) -> CoreResult<MediaInfo> {
        log::debug!("Running ffprobe for media info on: {}", input_path.display());

        let metadata = ffprobe(input_path).map_err(|err| {
            log::error!("ffprobe failed on {}: {err:?}", input_path.display());
            map_ffprobe_error(err, "media info")
        })?;

        let video_stream = metadata.streams.first().ok_or_else(|| {
            CoreError::VideoInfoError(format!("No streams found in {}", input_path.display()))
        })?;
        if video_stream.codec_type.as_deref() != Some("video") {
            return Err(CoreError::VideoInfoError(format!(
                "First stream of {} is not a video stream",
                input_path.display()
            )));
        }

        let (width, height) = match (video_stream.width, video_stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w as u32, h as u32),
            (w, h) => {
                return Err(CoreError::VideoInfoError(format!(
                    "Invalid dimensions in {}: width={w:?}, height={h:?}",
                    input_path.display()
                )));
            }
        };

        let frame_rate = FrameRate::parse(&video_stream.avg_frame_rate)
            .or_else(|| FrameRate::parse(&video_stream.r_frame_rate))
            .unwrap_or_else(|| {
                log::warn!(
                    "Unknown frame rate for {}, assuming 1 fps",
                    input_path.display()
                );
                FrameRate::default()
            });

        let audio_streams = metadata
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("audio"))
            .enumerate()
            .map(|(index, s)| AudioStreamInfo {
                index,
                channels: s.channels.map_or(0, |c| c.max(0) as u32),
                codec_name: s.codec_name.clone().unwrap_or_default(),
                measured_bitrate_bps: None,
            })
            .collect::<Vec<_>>();

        let duration_ms = parse_duration_ms(metadata.format.duration.as_deref());

        log::debug!(
            "Probed {}: {}x{} @ {} fps, duration={:?} ms, {} audio stream(s)",
            input_path.display(),
            width,
            height,
            frame_rate,
            duration_ms,
            audio_streams.len()
        );

        Ok(MediaInfo {
            duration_ms,
            width,
            height,
            frame_rate,
            audio_streams,
        })
    }

    fn probe_duration(&self, input_path: &Path) -> CoreResult<Option<u64>> {
        let metadata = ffprobe(input_path).map_err(|err| map_ffprobe_error(err, "duration"))?;
        Ok(parse_duration_ms(metadata.format.duration.as_deref()))
    }
}

/// Parses ffprobe's seconds string into milliseconds.
fn parse_duration_ms(duration: Option<&str>) -> Option<u64> {
    duration
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| (secs * 1000.0).round() as u64)
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::FfprobeParse(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms(Some("60.000000")), Some(60_000));
        assert_eq!(parse_duration_ms(Some("12.3456")), Some(12_346));
        assert_eq!(parse_duration_ms(Some("N/A")), None);
        assert_eq!(parse_duration_ms(Some("0")), None);
        assert_eq!(parse_duration_ms(None), None);
    }
}

//! Probed media properties and the trim window derived from them.
//!
//! `MediaInfo` is produced once per input by the prober and never changes
//! afterwards. Durations are kept in whole milliseconds.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame rate as a rational number (e.g. 30000/1001).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Parses ffprobe's `num/den` notation. Zero numerators or denominators
    /// (ffprobe reports `0/0` for unknown rates) are rejected.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (num, den) = match value.split_once('/') {
            Some((n, d)) => (n.trim().parse::<u32>().ok()?, d.trim().parse::<u32>().ok()?),
            None => (value.trim().parse::<u32>().ok()?, 1),
        };
        (num > 0 && den > 0).then_some(Self { num, den })
    }

    /// Builds a rate from a decimal value with millihertz precision.
    #[must_use]
    pub fn from_f64(fps: f64) -> Self {
        if fps.fract() == 0.0 && fps >= 1.0 {
            Self::new(fps as u32, 1)
        } else {
            Self::new((fps * 1000.0).round().max(1.0) as u32, 1000)
        }
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Picture geometry used by the filter planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

impl Geometry {
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Properties of one input audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Position among the input's audio streams (the `N` in `0:a:N`).
    pub index: usize,
    pub channels: u32,
    pub codec_name: String,
    /// Bitrate measured by a copy test, in bits per second.
    pub measured_bitrate_bps: Option<u64>,
}

/// Everything the planners need to know about an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// `None` when the container does not report a duration.
    pub duration_ms: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub audio_streams: Vec<AudioStreamInfo>,
}

impl MediaInfo {
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        Geometry {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
        }
    }
}

/// Portion of the input that is encoded, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TrimWindow {
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Resolves user start/end seconds against the probed duration.
    ///
    /// Returns `Ok(None)` when neither bound is set. A start at or beyond the
    /// end of the input, or an end past it, is an error.
    pub fn resolve(
        start: Option<f64>,
        end: Option<f64>,
        duration_ms: u64,
    ) -> CoreResult<Option<Self>> {
        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        let start_ms = start.map_or(0, seconds_to_ms);
        let end_ms = end.map_or(duration_ms, seconds_to_ms);

        if start_ms >= duration_ms {
            return Err(CoreError::InvalidTrim(format!(
                "start {} is not before the end of the input ({})",
                format_seconds(start_ms),
                format_seconds(duration_ms)
            )));
        }
        if end_ms > duration_ms {
            return Err(CoreError::InvalidTrim(format!(
                "end {} is past the end of the input ({})",
                format_seconds(end_ms),
                format_seconds(duration_ms)
            )));
        }
        if end_ms <= start_ms {
            return Err(CoreError::InvalidTrim(format!(
                "end {} is not after start {}",
                format_seconds(end_ms),
                format_seconds(start_ms)
            )));
        }

        Ok(Some(Self { start_ms, end_ms }))
    }
}

/// Converts seconds to whole milliseconds, rounding to the nearest.
#[must_use]
pub fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Formats milliseconds as seconds with three decimals, as ffmpeg accepts.
#[must_use]
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

//! Configuration structures and constants for the fitenc-core library.
//!
//! This module holds every knob the size search consumes: the byte window,
//! the iteration budget, the bpp quality floor, resolution and frame-rate
//! bounds, audio allocation settings and the encoder tuning flags. The
//! configuration is owned by the caller (usually fitenc-cli) and is never
//! mutated by the library.

mod builder;

use crate::error::{CoreError, CoreResult};
use crate::processing::params::SizeBudget;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use builder::CoreConfigBuilder;

// Default constants

/// Default output size limit in MiB.
pub const DEFAULT_SIZE_LIMIT_MIB: f64 = 3.0;

/// Default undershoot ratio; outputs below `limit * ratio` are too small.
pub const DEFAULT_UNDERSHOOT: f64 = 0.75;

/// Default number of encode attempts per bitrate mode.
pub const DEFAULT_ITERATIONS: u32 = 3;

/// Default number of encoder passes per attempt.
pub const DEFAULT_PASSES: u8 = 2;

/// Default bits-per-pixel quality floor used for downscaling decisions.
pub const DEFAULT_BPP_THRESHOLD: f64 = 0.075;

/// Height below which automatic downscaling never goes.
pub const DEFAULT_MIN_HEIGHT_THRESHOLD: u32 = 240;

/// Default minimum output frame rate.
pub const DEFAULT_MIN_FPS: f64 = 24.0;

/// Default minimum audio bitrate per channel in kbps.
pub const DEFAULT_MIN_AUDIO_BITRATE: u32 = 6;

/// Default maximum audio bitrate per channel in kbps (effectively unbounded).
pub const DEFAULT_MAX_AUDIO_BITRATE: u32 = 9999;

/// Empirically tuned divisor of the audio allocation factor.
pub const DEFAULT_AUDIO_FACTOR: f64 = 5.5;

/// Default output directory name.
pub const DEFAULT_OUTPUT_DIR: &str = "webm_done";

/// Audio encoders the output may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Vorbis,
    Opus,
}

impl AudioCodec {
    /// ffmpeg encoder name.
    #[must_use]
    pub fn encoder_name(self) -> &'static str {
        match self {
            AudioCodec::Vorbis => "libvorbis",
            AudioCodec::Opus => "libopus",
        }
    }

    /// Substring identifying the codec family in an ffprobe codec name.
    #[must_use]
    pub fn family(self) -> &'static str {
        match self {
            AudioCodec::Vorbis => "vorbis",
            AudioCodec::Opus => "opus",
        }
    }
}

/// Video encoders the output may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    Vp8,
    Vp9,
}

impl VideoCodec {
    /// ffmpeg encoder name.
    #[must_use]
    pub fn encoder_name(self) -> &'static str {
        match self {
            VideoCodec::Vp8 => "libvpx",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }
}

/// Whether compatible input audio streams may be copied instead of re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Copy when the codec matches and the input bitrate fits the budget.
    #[default]
    Auto,
    /// Never copy.
    Disabled,
    /// Copy every codec-compatible stream regardless of its bitrate.
    Forced,
}

/// Main configuration structure for the fitenc-core library.
///
/// All fields have defaults matching the command-line defaults; use
/// [`CoreConfigBuilder`] for a fluent construction and call
/// [`CoreConfig::validate`] before handing it to `process_videos`.
///
/// # Examples
///
/// ```rust
/// use fitenc_core::config::CoreConfigBuilder;
///
/// let config = CoreConfigBuilder::new()
///     .size_limit_mib(4.0)
///     .undershoot(0.8)
///     .include_audio(true)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory where finished outputs are written
    pub output_dir: PathBuf,

    /// Optional directory for per-input workspaces (defaults to `output_dir`)
    pub temp_dir: Option<PathBuf>,

    /// Output size limit in MiB
    pub size_limit_mib: f64,

    /// Lower bound of the size window as a fraction of the limit, in [0, 1]
    pub undershoot: f64,

    /// Encode attempts per bitrate mode; the enhance phase gets twice as many
    pub iterations: u32,

    /// Encoder passes per attempt (1 or 2)
    pub passes: u8,

    /// Bits-per-pixel floor driving downscaling and frame-rate reduction
    pub bpp_threshold: f64,

    /// Automatic downscaling never goes below this height
    pub min_height_threshold: u32,

    /// User minimum output height
    pub min_height: Option<u32>,

    /// User maximum output height
    pub max_height: Option<u32>,

    /// Minimum output frame rate
    pub min_fps: f64,

    /// User maximum output frame rate
    pub max_fps: Option<f64>,

    /// Minimum audio bitrate per channel (kbps)
    pub min_audio_bitrate: u32,

    /// Maximum audio bitrate per channel (kbps)
    pub max_audio_bitrate: u32,

    /// Divisor used when choosing the audio channel bitrate
    pub audio_factor: f64,

    /// Whether input audio streams are carried into the output
    pub include_audio: bool,

    pub audio_codec: AudioCodec,

    pub video_codec: VideoCodec,

    /// Downmix every audio stream to stereo
    pub force_stereo: bool,

    /// Keep at most one video and one audio stream
    pub basic_format: bool,

    pub copy_mode: CopyMode,

    /// User video filter chain, applied before any automatic scaling
    pub video_filters: Option<String>,

    /// The user video filters already scale the picture
    pub user_scale: bool,

    /// The user video filters already change the frame rate
    pub user_fps: bool,

    /// User audio filter chain
    pub audio_filters: Option<String>,

    /// Trim start in seconds
    pub start: Option<f64>,

    /// Trim end in seconds
    pub end: Option<f64>,

    /// Preserve an alpha channel (yuva420p)
    pub transparency: bool,

    /// Leave the user filters out of the first pass
    pub no_filter_firstpass: bool,

    /// Start the search at VBR without the qmax cap
    pub skip_qmax: bool,

    /// Thread hint passed through to the encoder
    pub threads: Option<u32>,

    /// Dry run: encoder commands are only logged and sizes are supplied manually
    pub debug: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            temp_dir: None,
            size_limit_mib: DEFAULT_SIZE_LIMIT_MIB,
            undershoot: DEFAULT_UNDERSHOOT,
            iterations: DEFAULT_ITERATIONS,
            passes: DEFAULT_PASSES,
            bpp_threshold: DEFAULT_BPP_THRESHOLD,
            min_height_threshold: DEFAULT_MIN_HEIGHT_THRESHOLD,
            min_height: None,
            max_height: None,
            min_fps: DEFAULT_MIN_FPS,
            max_fps: None,
            min_audio_bitrate: DEFAULT_MIN_AUDIO_BITRATE,
            max_audio_bitrate: DEFAULT_MAX_AUDIO_BITRATE,
            audio_factor: DEFAULT_AUDIO_FACTOR,
            include_audio: false,
            audio_codec: AudioCodec::default(),
            video_codec: VideoCodec::default(),
            force_stereo: false,
            basic_format: false,
            copy_mode: CopyMode::default(),
            video_filters: None,
            user_scale: false,
            user_fps: false,
            audio_filters: None,
            start: None,
            end: None,
            transparency: false,
            no_filter_firstpass: false,
            skip_qmax: false,
            threads: None,
            debug: false,
        }
    }
}

impl CoreConfig {
    /// Byte window derived from the size limit and the undershoot ratio.
    #[must_use]
    pub fn size_budget(&self) -> SizeBudget {
        let max_bytes = (self.size_limit_mib * 1024.0 * 1024.0).round() as u64;
        SizeBudget::new(max_bytes, self.undershoot)
    }

    /// True when a start or end time restricts the encoded range.
    #[must_use]
    pub fn trim_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// True when user video filters run before the encoder.
    #[must_use]
    pub fn has_video_filters(&self) -> bool {
        self.video_filters.as_deref().is_some_and(|f| !f.trim().is_empty())
    }

    /// True when user audio filters run before the encoder.
    #[must_use]
    pub fn has_audio_filters(&self) -> bool {
        self.audio_filters.as_deref().is_some_and(|f| !f.trim().is_empty())
    }

    /// Checks the configuration for invalid or conflicting values.
    ///
    /// Any error here is fatal: no input is processed with a configuration
    /// that fails validation.
    pub fn validate(&self) -> CoreResult<()> {
        fn invalid(msg: &str) -> CoreResult<()> {
            Err(CoreError::Config(msg.to_string()))
        }

        if !(self.size_limit_mib > 0.0) || !self.size_limit_mib.is_finite() {
            return invalid("size limit must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.undershoot) {
            return invalid("undershoot must be in the range [0, 1]");
        }
        if self.iterations == 0 {
            return invalid("iterations must be at least 1");
        }
        if !matches!(self.passes, 1 | 2) {
            return invalid("passes must be 1 or 2");
        }
        if !(self.bpp_threshold > 0.0) {
            return invalid("bpp threshold must be greater than 0");
        }
        if self.min_height_threshold == 0 {
            return invalid("min height threshold must be greater than 0");
        }
        if self.min_height == Some(0) {
            return invalid("min height must be greater than 0");
        }
        if self.max_height == Some(0) {
            return invalid("max height must be greater than 0");
        }
        if let (Some(min), Some(max)) = (self.min_height, self.max_height) {
            if min > max {
                return invalid("min height can't be greater than max height");
            }
        }
        if self.min_fps < 1.0 {
            return invalid("min fps can't be less than 1");
        }
        if let Some(max_fps) = self.max_fps {
            if self.min_fps > max_fps {
                return invalid("max fps can't be less than min fps");
            }
        }
        if self.min_audio_bitrate == 0 {
            return invalid("min audio bitrate must be greater than 0");
        }
        if self.min_audio_bitrate > self.max_audio_bitrate {
            return invalid("min audio bitrate can't be greater than max audio bitrate");
        }
        if !(self.audio_factor > 0.0) {
            return invalid("audio factor must be greater than 0");
        }
        if self.start.is_some_and(|s| s < 0.0) || self.end.is_some_and(|e| e < 0.0) {
            return invalid("start/end can't be less than 0");
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end <= start {
                return invalid("end can't be less than or equal to start");
            }
        }
        if (self.user_scale || self.user_fps) && !self.has_video_filters() {
            return invalid("scale/fps filter flags require a video filter chain");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.iterations, 3);
        assert_eq!(config.passes, 2);
        assert!(!config.trim_active());
    }

    #[test]
    fn test_size_budget_from_limit() {
        let config = CoreConfig {
            size_limit_mib: 3.0,
            undershoot: 0.75,
            ..Default::default()
        };
        let budget = config.size_budget();
        assert_eq!(budget.max_bytes, 3 * 1024 * 1024);
        assert_eq!(budget.min_bytes, 2_359_296);
    }

    #[test]
    fn test_rejects_conflicting_values() {
        let cases = [
            CoreConfig { undershoot: 1.5, ..Default::default() },
            CoreConfig { undershoot: -0.1, ..Default::default() },
            CoreConfig { min_height: Some(720), max_height: Some(480), ..Default::default() },
            CoreConfig { min_fps: 30.0, max_fps: Some(24.0), ..Default::default() },
            CoreConfig { min_audio_bitrate: 64, max_audio_bitrate: 32, ..Default::default() },
            CoreConfig { passes: 3, ..Default::default() },
            CoreConfig { iterations: 0, ..Default::default() },
            CoreConfig { bpp_threshold: 0.0, ..Default::default() },
            CoreConfig { start: Some(10.0), end: Some(5.0), ..Default::default() },
            CoreConfig { user_scale: true, ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(CoreError::Config(_))),
                "expected config error for {config:?}"
            );
        }
    }
}

// ============================================================================
// fitenc-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// This module implements the builder pattern for the CoreConfig structure,
// providing a fluent API over the defaults in config/mod.rs. The builder never
// validates; callers run CoreConfig::validate() on the result so that every
// configuration error surfaces in one place.
//
// KEY COMPONENTS:
// - CoreConfigBuilder: Builder struct for creating CoreConfig instances

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::{AudioCodec, CopyMode, CoreConfig, VideoCodec};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use fitenc_core::config::{CoreConfigBuilder, AudioCodec};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/path/to/output"))
///     .size_limit_mib(8.0)
///     .include_audio(true)
///     .audio_codec(AudioCodec::Opus)
///     .iterations(4)
///     .build();
/// assert_eq!(config.iterations, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory where finished outputs are written.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.config.output_dir = output_dir;
        self
    }

    /// Sets the parent directory for per-input workspaces.
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.config.temp_dir = Some(temp_dir);
        self
    }

    /// Sets the output size limit in MiB.
    pub fn size_limit_mib(mut self, size: f64) -> Self {
        self.config.size_limit_mib = size;
        self
    }

    /// Sets the undershoot ratio (0 disables the enhance phase).
    pub fn undershoot(mut self, ratio: f64) -> Self {
        self.config.undershoot = ratio;
        self
    }

    /// Sets the number of encode attempts per bitrate mode.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Sets the number of encoder passes (1 or 2).
    pub fn passes(mut self, passes: u8) -> Self {
        self.config.passes = passes;
        self
    }

    /// Sets the bits-per-pixel quality floor.
    pub fn bpp_threshold(mut self, bpp: f64) -> Self {
        self.config.bpp_threshold = bpp;
        self
    }

    /// Sets the height below which automatic downscaling never goes.
    pub fn min_height_threshold(mut self, height: u32) -> Self {
        self.config.min_height_threshold = height;
        self
    }

    pub fn min_height(mut self, height: Option<u32>) -> Self {
        self.config.min_height = height;
        self
    }

    pub fn max_height(mut self, height: Option<u32>) -> Self {
        self.config.max_height = height;
        self
    }

    pub fn min_fps(mut self, fps: f64) -> Self {
        self.config.min_fps = fps;
        self
    }

    pub fn max_fps(mut self, fps: Option<f64>) -> Self {
        self.config.max_fps = fps;
        self
    }

    /// Sets the per-channel audio bitrate bounds in kbps.
    pub fn audio_bitrate_bounds(mut self, min: u32, max: u32) -> Self {
        self.config.min_audio_bitrate = min;
        self.config.max_audio_bitrate = max;
        self
    }

    pub fn audio_factor(mut self, factor: f64) -> Self {
        self.config.audio_factor = factor;
        self
    }

    /// Sets whether input audio is carried into the output.
    pub fn include_audio(mut self, include: bool) -> Self {
        self.config.include_audio = include;
        self
    }

    pub fn audio_codec(mut self, codec: AudioCodec) -> Self {
        self.config.audio_codec = codec;
        self
    }

    pub fn video_codec(mut self, codec: VideoCodec) -> Self {
        self.config.video_codec = codec;
        self
    }

    pub fn force_stereo(mut self, enable: bool) -> Self {
        self.config.force_stereo = enable;
        self
    }

    pub fn basic_format(mut self, enable: bool) -> Self {
        self.config.basic_format = enable;
        self
    }

    pub fn copy_mode(mut self, mode: CopyMode) -> Self {
        self.config.copy_mode = mode;
        self
    }

    /// Sets the user video filter chain and whether it already scales or
    /// changes the frame rate.
    pub fn video_filters(mut self, filters: Option<String>, scales: bool, changes_fps: bool) -> Self {
        self.config.video_filters = filters;
        self.config.user_scale = scales;
        self.config.user_fps = changes_fps;
        self
    }

    pub fn audio_filters(mut self, filters: Option<String>) -> Self {
        self.config.audio_filters = filters;
        self
    }

    /// Sets the trim window in seconds.
    pub fn trim(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.config.start = start;
        self.config.end = end;
        self
    }

    pub fn transparency(mut self, enable: bool) -> Self {
        self.config.transparency = enable;
        self
    }

    pub fn no_filter_firstpass(mut self, enable: bool) -> Self {
        self.config.no_filter_firstpass = enable;
        self
    }

    /// Starts the search at plain VBR instead of VBR with the qmax cap.
    pub fn skip_qmax(mut self, enable: bool) -> Self {
        self.config.skip_qmax = enable;
        self
    }

    pub fn threads(mut self, threads: Option<u32>) -> Self {
        self.config.threads = threads;
        self
    }

    /// Enables dry-run mode.
    pub fn debug(mut self, enable: bool) -> Self {
        self.config.debug = enable;
        self
    }

    /// Builds a CoreConfig instance from the builder.
    pub fn build(self) -> CoreConfig {
        self.config
    }
}

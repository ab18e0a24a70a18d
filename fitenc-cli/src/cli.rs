// fitenc-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, ValueEnum};
use fitenc_core::config::{
    AudioCodec, CopyMode, CoreConfig, CoreConfigBuilder, DEFAULT_AUDIO_FACTOR,
    DEFAULT_BPP_THRESHOLD, DEFAULT_ITERATIONS, DEFAULT_MAX_AUDIO_BITRATE, DEFAULT_MIN_AUDIO_BITRATE,
    DEFAULT_MIN_FPS, DEFAULT_MIN_HEIGHT_THRESHOLD, DEFAULT_OUTPUT_DIR, DEFAULT_PASSES,
    DEFAULT_SIZE_LIMIT_MIB, DEFAULT_UNDERSHOOT, VideoCodec,
};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    name = "fitenc",
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "fitenc: size-targeted WebM encoder",
    long_about = "Encodes each input to WebM (VP8/VP9 + Vorbis/Opus) and repeats the encode \
                  with adjusted bitrates until the output size lands inside the requested window."
)]
pub struct Cli {
    /// Input video files
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Directory where finished files are written
    #[arg(short = 'o', long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Parent directory for per-input scratch workspaces (defaults to OUTPUT_DIR)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Show debug output on the console
    #[arg(short, long)]
    pub verbose: bool,

    // --- Size window ---
    /// Output size limit in MiB
    #[arg(short = 's', long = "size-limit", value_name = "MIB", default_value_t = DEFAULT_SIZE_LIMIT_MIB)]
    pub size_limit_mib: f64,

    /// Outputs smaller than LIMIT * RATIO are enhanced (0 disables enhancing)
    #[arg(short = 'u', long, value_name = "RATIO", default_value_t = DEFAULT_UNDERSHOOT)]
    pub undershoot: f64,

    /// Encode attempts per bitrate mode
    #[arg(short = 'i', long, value_name = "N", default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Encoder passes per attempt (1 or 2)
    #[arg(short = 'p', long, value_name = "N", default_value_t = DEFAULT_PASSES)]
    pub passes: u8,

    // --- Video ---
    /// Video codec of the output
    #[arg(long, value_enum, default_value_t = VideoCodecArg::Vp8)]
    pub video_codec: VideoCodecArg,

    /// Bits-per-pixel floor below which the picture is downscaled
    #[arg(long = "bpp", value_name = "BPP", default_value_t = DEFAULT_BPP_THRESHOLD)]
    pub bpp_threshold: f64,

    /// Height automatic downscaling never goes below
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_MIN_HEIGHT_THRESHOLD)]
    pub min_height_threshold: u32,

    /// Minimum output height
    #[arg(long, value_name = "PX")]
    pub min_height: Option<u32>,

    /// Maximum output height
    #[arg(long, value_name = "PX")]
    pub max_height: Option<u32>,

    /// Minimum output frame rate
    #[arg(long, value_name = "FPS", default_value_t = DEFAULT_MIN_FPS)]
    pub min_fps: f64,

    /// Maximum output frame rate
    #[arg(long, value_name = "FPS")]
    pub max_fps: Option<f64>,

    /// Video filter chain applied before automatic scaling
    #[arg(long = "vf", value_name = "FILTERS", allow_hyphen_values = true)]
    pub video_filters: Option<String>,

    /// The --vf chain already scales the picture
    #[arg(long, requires = "video_filters")]
    pub vf_scales: bool,

    /// The --vf chain already changes the frame rate
    #[arg(long, requires = "video_filters")]
    pub vf_fps: bool,

    /// Keep the alpha channel (yuva420p)
    #[arg(short = 't', long)]
    pub transparency: bool,

    /// Leave the --vf chain out of the first pass
    #[arg(long)]
    pub no_filter_firstpass: bool,

    /// Start the search at VBR instead of VBR with a quantizer cap
    #[arg(long = "no-qmax")]
    pub skip_qmax: bool,

    /// Encoder thread count
    #[arg(long, value_name = "N")]
    pub threads: Option<u32>,

    // --- Audio ---
    /// Carry the input's audio streams into the output
    #[arg(short = 'a', long = "audio")]
    pub include_audio: bool,

    /// Audio codec of re-encoded streams
    #[arg(long, value_enum, default_value_t = AudioCodecArg::Vorbis)]
    pub audio_codec: AudioCodecArg,

    /// Whether compatible audio streams may be copied
    #[arg(long, value_enum, default_value_t = CopyModeArg::Auto)]
    pub copy_mode: CopyModeArg,

    /// Minimum audio bitrate per channel (kbps)
    #[arg(long, value_name = "KBPS", default_value_t = DEFAULT_MIN_AUDIO_BITRATE)]
    pub min_audio_bitrate: u32,

    /// Maximum audio bitrate per channel (kbps)
    #[arg(long, value_name = "KBPS", default_value_t = DEFAULT_MAX_AUDIO_BITRATE)]
    pub max_audio_bitrate: u32,

    /// Divisor of the audio allocation factor; larger values give audio less
    #[arg(long, value_name = "FACTOR", default_value_t = DEFAULT_AUDIO_FACTOR)]
    pub audio_factor: f64,

    /// Downmix every audio stream to stereo
    #[arg(long)]
    pub force_stereo: bool,

    /// Keep at most one video and one audio stream
    #[arg(long)]
    pub basic_format: bool,

    /// Audio filter chain
    #[arg(long = "af", value_name = "FILTERS", allow_hyphen_values = true)]
    pub audio_filters: Option<String>,

    // --- Trim ---
    /// Start encoding at this many seconds into the input
    #[arg(long, value_name = "SECONDS")]
    pub start: Option<f64>,

    /// Stop encoding at this many seconds into the input
    #[arg(long, value_name = "SECONDS")]
    pub end: Option<f64>,

    /// Dry run: log encoder commands and type in the resulting sizes
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VideoCodecArg {
    Vp8,
    Vp9,
}

impl From<VideoCodecArg> for VideoCodec {
    fn from(arg: VideoCodecArg) -> Self {
        match arg {
            VideoCodecArg::Vp8 => VideoCodec::Vp8,
            VideoCodecArg::Vp9 => VideoCodec::Vp9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioCodecArg {
    Vorbis,
    Opus,
}

impl From<AudioCodecArg> for AudioCodec {
    fn from(arg: AudioCodecArg) -> Self {
        match arg {
            AudioCodecArg::Vorbis => AudioCodec::Vorbis,
            AudioCodecArg::Opus => AudioCodec::Opus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyModeArg {
    Auto,
    Disabled,
    Forced,
}

impl From<CopyModeArg> for CopyMode {
    fn from(arg: CopyModeArg) -> Self {
        match arg {
            CopyModeArg::Auto => CopyMode::Auto,
            CopyModeArg::Disabled => CopyMode::Disabled,
            CopyModeArg::Forced => CopyMode::Forced,
        }
    }
}

impl Cli {
    /// Log directory, defaulting to `<output_dir>/logs`.
    #[must_use]
    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("logs"))
    }

    /// Builds the (unvalidated) core configuration from the parsed flags.
    #[must_use]
    pub fn to_core_config(&self) -> CoreConfig {
        let mut builder = CoreConfigBuilder::new()
            .output_dir(self.output_dir.clone())
            .size_limit_mib(self.size_limit_mib)
            .undershoot(self.undershoot)
            .iterations(self.iterations)
            .passes(self.passes)
            .bpp_threshold(self.bpp_threshold)
            .min_height_threshold(self.min_height_threshold)
            .min_height(self.min_height)
            .max_height(self.max_height)
            .min_fps(self.min_fps)
            .max_fps(self.max_fps)
            .audio_bitrate_bounds(self.min_audio_bitrate, self.max_audio_bitrate)
            .audio_factor(self.audio_factor)
            .include_audio(self.include_audio)
            .audio_codec(self.audio_codec.into())
            .video_codec(self.video_codec.into())
            .force_stereo(self.force_stereo)
            .basic_format(self.basic_format)
            .copy_mode(self.copy_mode.into())
            .video_filters(self.video_filters.clone(), self.vf_scales, self.vf_fps)
            .audio_filters(self.audio_filters.clone())
            .trim(self.start, self.end)
            .transparency(self.transparency)
            .no_filter_firstpass(self.no_filter_firstpass)
            .skip_qmax(self.skip_qmax)
            .threads(self.threads)
            .debug(self.debug);
        if let Some(dir) = &self.temp_dir {
            builder = builder.temp_dir(dir.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["fitenc", "clip.mp4"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("clip.mp4")]);
        assert_eq!(cli.output_dir, PathBuf::from("webm_done"));
        assert_eq!(cli.effective_log_dir(), PathBuf::from("webm_done/logs"));

        let config = cli.to_core_config();
        assert_eq!(config.size_limit_mib, 3.0);
        assert_eq!(config.undershoot, 0.75);
        assert_eq!(config.iterations, 3);
        assert_eq!(config.passes, 2);
        assert!(!config.include_audio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_flag_set() {
        let cli = Cli::parse_from([
            "fitenc",
            "a.mkv",
            "b.mkv",
            "-s",
            "8",
            "-u",
            "0.9",
            "-a",
            "--audio-codec",
            "opus",
            "--video-codec",
            "vp9",
            "--copy-mode",
            "disabled",
            "--vf",
            "crop=640:360,scale=-2:360",
            "--vf-scales",
            "--start",
            "5",
            "--end",
            "35.5",
            "--no-qmax",
            "--threads",
            "4",
            "--log-dir",
            "logs",
        ]);
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.effective_log_dir(), PathBuf::from("logs"));

        let config = cli.to_core_config();
        assert_eq!(config.size_limit_mib, 8.0);
        assert_eq!(config.audio_codec, AudioCodec::Opus);
        assert_eq!(config.video_codec, VideoCodec::Vp9);
        assert_eq!(config.copy_mode, CopyMode::Disabled);
        assert!(config.user_scale);
        assert!(!config.user_fps);
        assert_eq!(config.start, Some(5.0));
        assert_eq!(config.end, Some(35.5));
        assert!(config.skip_qmax);
        assert_eq!(config.threads, Some(4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_flags_require_chain() {
        assert!(Cli::try_parse_from(["fitenc", "a.mkv", "--vf-fps"]).is_err());
        assert!(Cli::try_parse_from(["fitenc"]).is_err());
    }
}

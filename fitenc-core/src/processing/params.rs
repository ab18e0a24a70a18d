//! Value types shared by the planners, the encoder and the size search.

use crate::config::{CoreConfig, VideoCodec};
use crate::processing::audio::AudioPlan;
use crate::processing::filters::FilterPlan;
use crate::processing::media_info::{FrameRate, TrimWindow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The acceptable output size window, in bytes.
///
/// `min_bytes` is always between 0 and `max_bytes`; a `min_bytes` of 0 means
/// any output that fits under the limit is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBudget {
    pub max_bytes: u64,
    pub min_bytes: u64,
}

impl SizeBudget {
    /// Builds the window from the limit and an undershoot ratio in [0, 1].
    #[must_use]
    pub fn new(max_bytes: u64, undershoot: f64) -> Self {
        let ratio = undershoot.clamp(0.0, 1.0);
        let min_bytes = ((max_bytes as f64) * ratio).floor() as u64;
        Self {
            max_bytes,
            min_bytes: min_bytes.min(max_bytes),
        }
    }

    #[must_use]
    pub fn fits(&self, bytes: u64) -> bool {
        bytes <= self.max_bytes
    }

    #[must_use]
    pub fn contains(&self, bytes: u64) -> bool {
        self.min_bytes <= bytes && bytes <= self.max_bytes
    }
}

/// Rate-control strategy of one encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitrateMode {
    /// Variable bitrate with the quantizer capped at 50.
    VbrQmax,
    /// Plain variable bitrate.
    Vbr,
    /// Constant bitrate (min = max = target).
    Cbr,
}

impl BitrateMode {
    /// The mode tried after this one is exhausted, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            BitrateMode::VbrQmax => Some(BitrateMode::Vbr),
            BitrateMode::Vbr => Some(BitrateMode::Cbr),
            BitrateMode::Cbr => None,
        }
    }

    /// First mode of a search.
    #[must_use]
    pub fn first(skip_qmax: bool) -> Self {
        if skip_qmax {
            BitrateMode::Vbr
        } else {
            BitrateMode::VbrQmax
        }
    }
}

impl fmt::Display for BitrateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BitrateMode::VbrQmax => "VBR+qmax",
            BitrateMode::Vbr => "VBR",
            BitrateMode::Cbr => "CBR",
        };
        f.write_str(name)
    }
}

/// Complete, immutable description of one encode attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeParameters {
    pub mode: BitrateMode,
    pub video_bitrate_kbps: u32,
    pub out_height: u32,
    pub out_frame_rate: FrameRate,
    /// User chain followed by the automatic scale/fps filters.
    pub filter_graph: Option<String>,
    /// Automatic filters only; used for a first pass that skips user filters.
    pub auto_filter_graph: Option<String>,
    pub audio_plan: AudioPlan,
}

impl EncodeParameters {
    /// Combines a bitrate decision with the current filter and audio plans.
    #[must_use]
    pub fn new(
        mode: BitrateMode,
        video_bitrate_kbps: u32,
        filters: &FilterPlan,
        user_filters: Option<&str>,
        audio_plan: &AudioPlan,
    ) -> Self {
        Self {
            mode,
            video_bitrate_kbps: video_bitrate_kbps.max(1),
            out_height: filters.out_height,
            out_frame_rate: filters.out_frame_rate,
            filter_graph: filters.merged_graph(user_filters),
            auto_filter_graph: filters.merged_graph(None),
            audio_plan: audio_plan.clone(),
        }
    }
}

/// Outcome of one executed attempt, as fed to the size search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub params: EncodeParameters,
    pub output_bytes: u64,
    /// Where the attempt's artifact was kept, if it was.
    pub kept_artifact_path: Option<PathBuf>,
}

/// Per-input settings that stay fixed across every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub input: PathBuf,
    /// Instance workspace holding pass logs and scratch outputs.
    pub workspace: PathBuf,
    pub trim: Option<TrimWindow>,
    pub video_codec: VideoCodec,
    pub passes: u8,
    pub transparency: bool,
    pub threads: Option<u32>,
    pub no_filter_firstpass: bool,
    pub user_video_filters: Option<String>,
    pub audio_filters: Option<String>,
}

impl EncodeJob {
    #[must_use]
    pub fn new(input: &Path, workspace: &Path, config: &CoreConfig, trim: Option<TrimWindow>) -> Self {
        Self {
            input: input.to_path_buf(),
            workspace: workspace.to_path_buf(),
            trim,
            video_codec: config.video_codec,
            passes: config.passes,
            transparency: config.transparency,
            threads: config.threads,
            no_filter_firstpass: config.no_filter_firstpass,
            user_video_filters: config
                .video_filters
                .clone()
                .filter(|f| !f.trim().is_empty()),
            audio_filters: config
                .audio_filters
                .clone()
                .filter(|f| !f.trim().is_empty()),
        }
    }

    /// Prefix for ffmpeg's two-pass statistics files.
    #[must_use]
    pub fn pass_log_prefix(&self) -> PathBuf {
        self.workspace.join("ffmpeg2pass")
    }
}

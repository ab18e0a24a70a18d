//! Audio stream planning.
//!
//! Decides, for every kept input audio stream, whether it is copied or
//! re-encoded, with which codec and at which bitrate. The per-channel bitrate
//! is picked from a step table driven by how many bits per second and channel
//! the size limit leaves over the output duration.

use crate::config::{AudioCodec, CopyMode, CoreConfig};
use crate::error::CoreResult;
use crate::external::ffmpeg::TestEncoder;
use crate::processing::media_info::AudioStreamInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Copy is allowed while the input bitrate is at most 5% above the planned one.
const COPY_TOLERANCE_PERCENT: u128 = 105;

/// Plan for one output audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStreamPlan {
    /// Position among the input's audio streams.
    pub input_index: usize,
    pub codec: AudioCodec,
    /// Stream is copied without re-encoding.
    pub copy: bool,
    /// Channel count of the output stream.
    pub channels: u32,
    pub bitrate_kbps: u32,
}

/// Audio layout of every attempt for one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPlan {
    pub streams: Vec<AudioStreamPlan>,
    /// Output sample rate of encoded streams; native when `None`.
    pub sample_rate: Option<u32>,
    pub total_bitrate_kbps: u32,
    /// Channel count forced on every encoded stream (stereo downmix).
    pub channels_override: Option<u32>,
}

impl AudioPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Per-channel bitrate in kbps for an allocation factor.
#[must_use]
pub fn per_channel_step(factor: f64) -> u32 {
    const STEPS: [(f64, u32); 9] = [
        (1.0, 6),
        (2.0, 8),
        (3.0, 12),
        (4.0, 16),
        (6.0, 24),
        (8.0, 32),
        (28.0, 48),
        (72.0, 64),
        (120.0, 80),
    ];
    STEPS
        .iter()
        .find(|(limit, _)| factor < *limit)
        .map_or(96, |(_, kbps)| *kbps)
}

/// Output sample rate for a per-channel bitrate; `None` keeps the native rate.
#[must_use]
pub fn sample_rate_for(per_channel_kbps: u32) -> Option<u32> {
    match per_channel_kbps {
        0..=6 => Some(8000),
        7..=12 => Some(12000),
        13..=16 => Some(24000),
        _ => None,
    }
}

/// Plans audio streams for one input.
#[derive(Debug, Clone)]
pub struct AudioPlanner {
    include_audio: bool,
    basic_format: bool,
    force_stereo: bool,
    codec: AudioCodec,
    copy_mode: CopyMode,
    has_audio_filters: bool,
    audio_factor: f64,
    min_channel_kbps: u32,
    max_channel_kbps: u32,
}

impl AudioPlanner {
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            include_audio: config.include_audio,
            basic_format: config.basic_format,
            force_stereo: config.force_stereo,
            codec: config.audio_codec,
            copy_mode: config.copy_mode,
            has_audio_filters: config.has_audio_filters(),
            audio_factor: config.audio_factor,
            min_channel_kbps: config.min_audio_bitrate,
            max_channel_kbps: config.max_audio_bitrate,
        }
    }

    /// Input streams carried into the output.
    #[must_use]
    pub fn kept_streams<'a>(&self, streams: &'a [AudioStreamInfo]) -> &'a [AudioStreamInfo] {
        if !self.include_audio {
            &[]
        } else if self.basic_format {
            &streams[..streams.len().min(1)]
        } else {
            streams
        }
    }

    fn output_channels(&self, stream: &AudioStreamInfo) -> u32 {
        if self.force_stereo { 2 } else { stream.channels }
    }

    /// Uniform per-channel bitrate, clamped into the configured bounds.
    #[must_use]
    pub fn channel_bitrate(&self, max_bytes: u64, duration_ms: u64, total_channels: u32) -> u32 {
        let duration_secs = duration_ms as f64 / 1000.0;
        let denominator = duration_secs * self.audio_factor * f64::from(total_channels) * 4.0 * 1000.0;
        let factor = if denominator > 0.0 {
            (max_bytes as f64) * 8.0 / denominator
        } else {
            f64::INFINITY
        };
        per_channel_step(factor).clamp(self.min_channel_kbps, self.max_channel_kbps)
    }

    fn copy_allowed(&self, trim_active: bool) -> bool {
        self.copy_mode != CopyMode::Disabled && !trim_active && !self.has_audio_filters
    }

    /// Whether an input codec may be stream-copied into the chosen output codec.
    fn codec_compatible(&self, stream: &AudioStreamInfo) -> bool {
        let name = stream.codec_name.to_ascii_lowercase();
        if self.force_stereo && stream.channels != 2 {
            return false;
        }
        name.contains(AudioCodec::Vorbis.family())
            || (self.codec == AudioCodec::Opus && name.contains(AudioCodec::Opus.family()))
    }

    /// Builds the audio plan.
    ///
    /// Copy tests and Opus probes run through `tester` inside `workspace`;
    /// their failures only disable copying or Opus for that stream.
    pub fn plan<T: TestEncoder>(
        &self,
        tester: &T,
        input: &Path,
        workspace: &Path,
        streams: &[AudioStreamInfo],
        duration_ms: u64,
        max_bytes: u64,
        trim_active: bool,
    ) -> CoreResult<AudioPlan> {
        let kept = self.kept_streams(streams);
        let total_channels: u32 = kept.iter().map(|s| self.output_channels(s)).sum();
        if kept.is_empty() || total_channels == 0 {
            return Ok(AudioPlan::default());
        }

        let per_channel = self.channel_bitrate(max_bytes, duration_ms, total_channels);
        let copy_allowed = self.copy_allowed(trim_active);
        let mut plans = Vec::with_capacity(kept.len());

        for stream in kept {
            let channels = self.output_channels(stream);
            let planned_kbps = channels * per_channel;

            let copied_kbps = if copy_allowed && self.codec_compatible(stream) {
                self.copy_decision(tester, input, workspace, stream, planned_kbps)
            } else {
                None
            };

            let plan = match copied_kbps {
                Some(bitrate_kbps) => AudioStreamPlan {
                    input_index: stream.index,
                    codec: if stream.codec_name.to_ascii_lowercase().contains("opus") {
                        AudioCodec::Opus
                    } else {
                        AudioCodec::Vorbis
                    },
                    copy: true,
                    channels: stream.channels,
                    bitrate_kbps,
                },
                None => AudioStreamPlan {
                    input_index: stream.index,
                    codec: self.encoder_for(tester, input, workspace, stream, channels),
                    copy: false,
                    channels,
                    bitrate_kbps: planned_kbps,
                },
            };
            log::debug!(
                "Audio stream {}: {} {} kbps ({} ch{})",
                plan.input_index,
                plan.codec.encoder_name(),
                plan.bitrate_kbps,
                plan.channels,
                if plan.copy { ", copied" } else { "" }
            );
            plans.push(plan);
        }

        let any_encoded = plans.iter().any(|p| !p.copy);
        let total_bitrate_kbps = plans.iter().map(|p| p.bitrate_kbps).sum();

        Ok(AudioPlan {
            streams: plans,
            sample_rate: if any_encoded { sample_rate_for(per_channel) } else { None },
            total_bitrate_kbps,
            channels_override: self.force_stereo.then_some(2),
        })
    }

    /// Returns the copied stream's bitrate (kbps, rounded up) when it should be copied.
    fn copy_decision<T: TestEncoder>(
        &self,
        tester: &T,
        input: &Path,
        workspace: &Path,
        stream: &AudioStreamInfo,
        planned_kbps: u32,
    ) -> Option<u32> {
        let forced = self.copy_mode == CopyMode::Forced;
        let measured = stream.measured_bitrate_bps.or_else(|| {
            match tester.measure_audio_bitrate(input, workspace, stream.index) {
                Ok(bps) => bps,
                Err(e) => {
                    log::warn!("Audio copy test failed for stream {}: {e}", stream.index);
                    None
                }
            }
        });

        match measured {
            Some(bps) => {
                let fits = u128::from(bps) * 100
                    <= u128::from(planned_kbps) * 1000 * COPY_TOLERANCE_PERCENT;
                (fits || forced).then(|| bps.div_ceil(1000).max(1) as u32)
            }
            None if forced => Some(planned_kbps),
            None => None,
        }
    }

    /// Chosen encoder for a re-encoded stream, falling back to Vorbis when
    /// libopus rejects the channel layout.
    fn encoder_for<T: TestEncoder>(
        &self,
        tester: &T,
        input: &Path,
        workspace: &Path,
        stream: &AudioStreamInfo,
        channels: u32,
    ) -> AudioCodec {
        if self.codec != AudioCodec::Opus || channels <= 2 {
            return self.codec;
        }
        match tester.opus_supported(input, workspace, stream.index) {
            Ok(true) => AudioCodec::Opus,
            Ok(false) => {
                log::warn!(
                    "libopus can't encode stream {} ({} channels), using libvorbis",
                    stream.index,
                    channels
                );
                AudioCodec::Vorbis
            }
            Err(e) => {
                log::warn!("Opus test encode failed for stream {}: {e}", stream.index);
                AudioCodec::Vorbis
            }
        }
    }
}

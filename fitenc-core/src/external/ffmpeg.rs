//! FFmpeg command building and execution for size-targeted encoding.
//!
//! This module turns immutable [`EncodeParameters`] into libvpx command lines
//! (one or two passes) and runs the throwaway test encodes the planners need:
//! audio copy measurement, Opus layout probing, duration recovery and the
//! geometry produced by user filters.

use crate::config::AudioCodec;
use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_executor::{FfmpegInvocation, FfmpegSpawner, run_ffmpeg};
use crate::external::ffprobe_executor::FfprobeExecutor;
use crate::processing::media_info::{Geometry, format_seconds};
use crate::processing::params::{BitrateMode, EncodeJob, EncodeParameters};
use crate::temp_files;

use std::path::Path;

/// Quantizer cap applied in [`BitrateMode::VbrQmax`].
const QMAX: u32 = 50;

/// Seconds of audio muxed by the copy test.
const COPY_TEST_SECONDS: &str = "5";

/// Seconds encoded by the Opus and filter geometry probes.
const PROBE_SECONDS: &str = "1";

/// Executes one encode attempt.
pub trait Encoder {
    /// Encodes `job.input` with `params`, writing the artifact to `output`.
    fn encode(&self, job: &EncodeJob, params: &EncodeParameters, output: &Path) -> CoreResult<()>;
}

/// Throwaway invocations used while planning. None of them count as attempts.
pub trait TestEncoder {
    /// Bitrate of an input audio stream in bits per second, measured by
    /// stream-copying its first seconds. `None` when it can't be determined.
    fn measure_audio_bitrate(
        &self,
        input: &Path,
        workspace: &Path,
        stream_index: usize,
    ) -> CoreResult<Option<u64>>;

    /// Whether libopus accepts the channel layout of an input audio stream.
    fn opus_supported(&self, input: &Path, workspace: &Path, stream_index: usize) -> CoreResult<bool>;

    /// Duration in milliseconds recovered by re-encoding the whole video stream.
    fn measure_duration(&self, input: &Path, workspace: &Path) -> CoreResult<Option<u64>>;

    /// Output geometry of the user's video filter chain.
    fn filtered_geometry(&self, input: &Path, workspace: &Path, filters: &str) -> CoreResult<Geometry>;
}

/// Which part of an attempt an invocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePass {
    Single,
    First,
    Second,
}

fn push_input(inv: &mut FfmpegInvocation, job: &EncodeJob) {
    inv.arg("-y");
    if let Some(trim) = job.trim {
        inv.opt("-ss", format_seconds(trim.start_ms));
        inv.opt("-t", format_seconds(trim.duration_ms()));
    }
    inv.opt("-i", job.input.display());
}

fn push_video(inv: &mut FfmpegInvocation, job: &EncodeJob, params: &EncodeParameters, pass: EncodePass) {
    let bitrate = format!("{}k", params.video_bitrate_kbps);
    inv.opt("-c:v", job.video_codec.encoder_name());
    inv.opt("-b:v", &bitrate);
    match params.mode {
        BitrateMode::VbrQmax => {
            inv.opt("-qmax", QMAX);
        }
        BitrateMode::Vbr => {}
        BitrateMode::Cbr => {
            inv.opt("-minrate", &bitrate).opt("-maxrate", &bitrate);
        }
    }

    if job.transparency {
        inv.opt("-pix_fmt", "yuva420p").opt("-auto-alt-ref", 0);
    } else {
        inv.opt("-pix_fmt", "yuv420p")
            .opt("-auto-alt-ref", 1)
            .opt("-lag-in-frames", 25)
            .opt("-arnr-maxframes", 15)
            .opt("-arnr-strength", 6);
    }

    let cpu_used = if pass == EncodePass::First { 5 } else { 0 };
    inv.opt("-deadline", "good").opt("-cpu-used", cpu_used);
    if let Some(threads) = job.threads {
        inv.opt("-threads", threads);
    }

    let graph = if pass == EncodePass::First && job.no_filter_firstpass {
        params.auto_filter_graph.as_deref()
    } else {
        params.filter_graph.as_deref()
    };
    if let Some(graph) = graph {
        inv.opt("-vf", graph);
    }
}

fn push_audio(inv: &mut FfmpegInvocation, job: &EncodeJob, params: &EncodeParameters) {
    let plan = &params.audio_plan;
    if plan.is_empty() {
        inv.arg("-an");
        return;
    }

    for (out_index, stream) in plan.streams.iter().enumerate() {
        if stream.copy {
            inv.opt(&format!("-c:a:{out_index}"), "copy");
            continue;
        }
        inv.opt(&format!("-c:a:{out_index}"), stream.codec.encoder_name());
        inv.opt(&format!("-b:a:{out_index}"), format!("{}k", stream.bitrate_kbps));
        if let Some(channels) = plan.channels_override {
            inv.opt(&format!("-ac:a:{out_index}"), channels);
        }
        if let Some(rate) = plan.sample_rate {
            // libopus only takes 48/24/16/12/8 kHz
            if stream.codec != AudioCodec::Opus || matches!(rate, 8000 | 12000 | 16000 | 24000 | 48000) {
                inv.opt(&format!("-ar:a:{out_index}"), rate);
            }
        }
    }

    if let Some(filters) = job.audio_filters.as_deref() {
        if plan.streams.iter().any(|s| !s.copy) {
            inv.opt("-af", filters);
        }
    }
}

/// Builds the ffmpeg arguments for one pass of an attempt.
#[must_use]
pub fn build_encode_invocation(
    job: &EncodeJob,
    params: &EncodeParameters,
    pass: EncodePass,
    output: &Path,
) -> FfmpegInvocation {
    let label = match pass {
        EncodePass::Single => format!("{} {}k", params.mode, params.video_bitrate_kbps),
        EncodePass::First => format!("{} {}k pass 1/2", params.mode, params.video_bitrate_kbps),
        EncodePass::Second => format!("{} {}k pass 2/2", params.mode, params.video_bitrate_kbps),
    };
    let mut inv = FfmpegInvocation::new(label);

    push_input(&mut inv, job);
    inv.opt("-map", "0:v:0");
    if pass != EncodePass::First {
        for stream in &params.audio_plan.streams {
            inv.opt("-map", format!("0:a:{}", stream.input_index));
        }
    }

    push_video(&mut inv, job, params, pass);

    match pass {
        EncodePass::First => {
            inv.arg("-an");
            inv.opt("-pass", 1);
            inv.opt("-passlogfile", job.pass_log_prefix().display());
            inv.opt("-f", "null");
            inv.arg("-");
        }
        EncodePass::Second | EncodePass::Single => {
            push_audio(&mut inv, job, params);
            if pass == EncodePass::Second {
                inv.opt("-pass", 2);
                inv.opt("-passlogfile", job.pass_log_prefix().display());
            }
            inv.opt("-f", "webm");
            inv.arg(output.display().to_string());
        }
    }

    inv
}

/// All invocations of one attempt, in execution order.
#[must_use]
pub fn build_attempt_invocations(
    job: &EncodeJob,
    params: &EncodeParameters,
    output: &Path,
) -> Vec<FfmpegInvocation> {
    if job.passes >= 2 {
        vec![
            build_encode_invocation(job, params, EncodePass::First, output),
            build_encode_invocation(job, params, EncodePass::Second, output),
        ]
    } else {
        vec![build_encode_invocation(job, params, EncodePass::Single, output)]
    }
}

/// [`Encoder`] that runs libvpx through an [`FfmpegSpawner`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder<S: FfmpegSpawner> {
    spawner: S,
}

impl<S: FfmpegSpawner> FfmpegEncoder<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: FfmpegSpawner> Encoder for FfmpegEncoder<S> {
    fn encode(&self, job: &EncodeJob, params: &EncodeParameters, output: &Path) -> CoreResult<()> {
        for invocation in build_attempt_invocations(job, params, output) {
            run_ffmpeg(&self.spawner, &invocation)?;
        }
        Ok(())
    }
}

/// [`TestEncoder`] backed by ffmpeg and ffprobe.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTestEncoder<S: FfmpegSpawner, P: FfprobeExecutor> {
    spawner: S,
    prober: P,
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> FfmpegTestEncoder<S, P> {
    pub fn new(spawner: S, prober: P) -> Self {
        Self { spawner, prober }
    }

    /// Runs `inv`, probes the duration of `scratch` and removes it again.
    fn encode_and_probe_duration(&self, inv: &FfmpegInvocation, scratch: &Path) -> CoreResult<(u64, Option<u64>)> {
        let result = run_ffmpeg(&self.spawner, inv).and_then(|()| {
            let bytes = std::fs::metadata(scratch)?.len();
            let duration = self.prober.probe_duration(scratch)?;
            Ok((bytes, duration))
        });
        remove_scratch(scratch);
        result
    }
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> TestEncoder for FfmpegTestEncoder<S, P> {
    fn measure_audio_bitrate(
        &self,
        input: &Path,
        workspace: &Path,
        stream_index: usize,
    ) -> CoreResult<Option<u64>> {
        let scratch = temp_files::create_temp_file_path(workspace, "copy_test", "mkv");
        let mut inv = FfmpegInvocation::new(format!("audio copy test a:{stream_index}"));
        inv.arg("-y")
            .opt("-t", COPY_TEST_SECONDS)
            .opt("-i", input.display())
            .opt("-map", format!("0:a:{stream_index}"))
            .opt("-c:a", "copy")
            .opt("-f", "matroska")
            .arg(scratch.display().to_string());

        let (bytes, duration_ms) = self.encode_and_probe_duration(&inv, &scratch)?;
        Ok(duration_ms
            .filter(|ms| *ms > 0)
            .map(|ms| bytes * 8 * 1000 / ms))
    }

    fn opus_supported(&self, input: &Path, _workspace: &Path, stream_index: usize) -> CoreResult<bool> {
        let mut inv = FfmpegInvocation::new(format!("opus test a:{stream_index}"));
        inv.arg("-y")
            .opt("-t", PROBE_SECONDS)
            .opt("-i", input.display())
            .opt("-map", format!("0:a:{stream_index}"))
            .opt("-c:a", "libopus")
            .opt("-f", "null")
            .arg("-");

        match run_ffmpeg(&self.spawner, &inv) {
            Ok(()) => Ok(true),
            Err(CoreError::CommandFailed(..)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn measure_duration(&self, input: &Path, workspace: &Path) -> CoreResult<Option<u64>> {
        log::info!("Input reports no duration, measuring it with a fast re-encode");
        let scratch = temp_files::create_temp_file_path(workspace, "duration", "mkv");
        let mut inv = FfmpegInvocation::new("duration recovery");
        inv.arg("-y")
            .opt("-i", input.display())
            .opt("-map", "0:v:0")
            .opt("-c:v", "libx264")
            .opt("-preset", "ultrafast")
            .opt("-crf", 51)
            .arg("-an")
            .opt("-f", "matroska")
            .arg(scratch.display().to_string());

        let (_, duration_ms) = self.encode_and_probe_duration(&inv, &scratch)?;
        Ok(duration_ms)
    }

    fn filtered_geometry(&self, input: &Path, workspace: &Path, filters: &str) -> CoreResult<Geometry> {
        let scratch = temp_files::create_temp_file_path(workspace, "filter_test", "mkv");
        let mut inv = FfmpegInvocation::new("filter geometry test");
        inv.arg("-y")
            .opt("-t", PROBE_SECONDS)
            .opt("-i", input.display())
            .opt("-map", "0:v:0")
            .opt("-vf", filters)
            .opt("-c:v", "rawvideo")
            .arg("-an")
            .opt("-f", "matroska")
            .arg(scratch.display().to_string());

        let result = run_ffmpeg(&self.spawner, &inv)
            .and_then(|()| self.prober.probe_media(&scratch))
            .map(|info| info.geometry());
        remove_scratch(&scratch);
        result
    }
}

/// Deletes a throwaway output; a file that was never written is fine.
fn remove_scratch(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

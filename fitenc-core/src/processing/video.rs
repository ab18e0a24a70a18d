// ============================================================================
// fitenc-core/src/processing/video.rs
// ============================================================================
//
// VIDEO PROCESSING: Batch orchestration
//
// Drives every input through probing, planning and the size search:
//
//   probe -> duration fallback -> trim -> geometry -> audio plan
//         -> initial bitrate -> size search -> outcome
//
// Probing and planning problems skip the input, encoder failures abort only
// that input, and a user interrupt stops the batch. Each input gets its own
// workspace, removed when the input finishes.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg::{Encoder, TestEncoder};
use crate::external::{FfprobeExecutor, FileMetadataProvider};
use crate::interrupt::InterruptFlag;
use crate::processing::audio::AudioPlanner;
use crate::processing::bitrate::initial_video_bitrate;
use crate::processing::media_info::TrimWindow;
use crate::processing::params::EncodeJob;
use crate::processing::size_search::{SearchOutcome, SearchSetup, SizeSearchController};
use crate::reporting::{BatchReport, FileOutcome, FileReport};
use crate::temp_files;
use crate::utils::{format_bytes, format_duration_ms, get_filename_safe, output_path_for};

use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// External collaborators of a batch.
pub struct Collaborators<'a, E, T, P, M>
where
    E: Encoder,
    T: TestEncoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
{
    pub encoder: &'a E,
    pub tester: &'a T,
    pub prober: &'a P,
    pub metadata: &'a M,
}

/// Processes every input in order and records an outcome for each.
///
/// Returns `Err` only for problems that affect the whole batch (an unusable
/// output directory); per-input failures are recorded in the report. After
/// an interrupt the remaining inputs are not started.
pub fn process_videos<E, T, P, M>(
    tools: &Collaborators<'_, E, T, P, M>,
    config: &CoreConfig,
    inputs: &[PathBuf],
    interrupt: &InterruptFlag,
) -> CoreResult<BatchReport>
where
    E: Encoder,
    T: TestEncoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
{
    std::fs::create_dir_all(&config.output_dir)?;

    let budget = config.size_budget();
    info!(
        "Target window: {} - {} ({} inputs)",
        format_bytes(budget.min_bytes),
        format_bytes(budget.max_bytes),
        inputs.len()
    );

    let mut report = BatchReport::default();
    for input in inputs {
        if interrupt.is_raised() {
            report.interrupted = true;
            break;
        }

        let filename = get_filename_safe(input).unwrap_or_else(|_| input.display().to_string());
        info!("----------------------------------------");
        info!("Processing: {filename}");

        let started = Instant::now();
        let (outcome, attempts) = process_single(tools, config, input, interrupt);
        match &outcome {
            FileOutcome::Success { bytes, .. } => info!("{filename}: done, {}", format_bytes(*bytes)),
            FileOutcome::TooSmall { .. } | FileOutcome::TooLarge => warn!("{filename}: {outcome}"),
            FileOutcome::Interrupted => warn!("{filename}: interrupted"),
            _ => error!("{filename}: {outcome}"),
        }

        let interrupted = outcome == FileOutcome::Interrupted;
        report.files.push(FileReport {
            input: input.clone(),
            outcome,
            attempts,
            elapsed: started.elapsed(),
        });
        if interrupted {
            report.interrupted = true;
            break;
        }
    }

    Ok(report)
}

fn probe_failed(err: impl std::fmt::Display) -> FileOutcome {
    FileOutcome::ProbeFailed {
        reason: err.to_string(),
    }
}

/// Runs one input; returns its outcome and the number of encode attempts.
fn process_single<E, T, P, M>(
    tools: &Collaborators<'_, E, T, P, M>,
    config: &CoreConfig,
    input: &Path,
    interrupt: &InterruptFlag,
) -> (FileOutcome, usize)
where
    E: Encoder,
    T: TestEncoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
{
    let media = match tools.prober.probe_media(input) {
        Ok(media) => media,
        Err(e) => return (probe_failed(e), 0),
    };

    let output = match output_path_for(input, &config.output_dir) {
        Ok(path) => path,
        Err(e) => return (probe_failed(e), 0),
    };

    let workspace = match temp_files::create_temp_dir(config, temp_files::WORKSPACE_PREFIX) {
        Ok(dir) => dir,
        Err(e) => return (FileOutcome::EncodeFailed { reason: e.to_string() }, 0),
    };
    let ws = workspace.path();

    let duration_ms = match media.duration_ms {
        Some(ms) => ms,
        None => match tools.tester.measure_duration(input, ws) {
            Ok(Some(ms)) => ms,
            Ok(None) => return (probe_failed("duration could not be determined"), 0),
            Err(e) => return (probe_failed(e), 0),
        },
    };

    let trim = match TrimWindow::resolve(config.start, config.end, duration_ms) {
        Ok(trim) => trim,
        Err(e) => return (probe_failed(e), 0),
    };
    let out_duration_ms = trim.map_or(duration_ms, |t| t.duration_ms());
    if out_duration_ms == 0 {
        return (probe_failed("output duration is zero"), 0);
    }
    info!(
        "Input: {}x{} @ {} fps, {} (encoding {})",
        media.width,
        media.height,
        media.frame_rate,
        format_duration_ms(duration_ms),
        format_duration_ms(out_duration_ms)
    );

    let geometry = if config.user_scale || config.user_fps {
        let filters = config.video_filters.as_deref().unwrap_or_default();
        match tools.tester.filtered_geometry(input, ws, filters) {
            Ok(geometry) => geometry,
            Err(e) => return (probe_failed(e), 0),
        }
    } else {
        media.geometry()
    };

    let budget = config.size_budget();
    let audio_plan = match AudioPlanner::new(config).plan(
        tools.tester,
        input,
        ws,
        &media.audio_streams,
        out_duration_ms,
        budget.max_bytes,
        trim.is_some(),
    ) {
        Ok(plan) => plan,
        Err(e) => return (probe_failed(e), 0),
    };

    let initial = initial_video_bitrate(budget.max_bytes, out_duration_ms, audio_plan.total_bitrate_kbps);
    info!(
        "Initial bitrate: {initial} kbps video + {} kbps audio",
        audio_plan.total_bitrate_kbps
    );

    let job = EncodeJob::new(input, ws, config, trim);
    let setup = SearchSetup {
        budget,
        initial_bitrate_kbps: initial,
        geometry,
        audio_plan: &audio_plan,
    };
    let controller = SizeSearchController::new(tools.encoder, tools.metadata, config, interrupt);

    match controller.run(&job, &setup, &output) {
        Ok(search) => {
            let attempts = search.attempts.len();
            let outcome = match search.outcome {
                SearchOutcome::Success { bytes } => FileOutcome::Success {
                    path: search.output_path,
                    bytes,
                },
                SearchOutcome::TooSmall { bytes } => FileOutcome::TooSmall {
                    path: search.output_path,
                    bytes,
                },
                SearchOutcome::TooLarge => FileOutcome::TooLarge,
            };
            (outcome, attempts)
        }
        Err(CoreError::Interrupted) => (FileOutcome::Interrupted, controller.attempts_made()),
        Err(e) => (
            FileOutcome::EncodeFailed { reason: e.to_string() },
            controller.attempts_made(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::StdFsMetadataProvider;
    use crate::external::mocks::{MockFfprobeExecutor, MockTestEncoder, ScriptedEncoder};
    use crate::processing::media_info::{AudioStreamInfo, FrameRate, MediaInfo};
    use tempfile::tempdir;

    fn media(duration_ms: Option<u64>) -> MediaInfo {
        MediaInfo {
            duration_ms,
            width: 1280,
            height: 720,
            frame_rate: FrameRate::new(30, 1),
            audio_streams: vec![AudioStreamInfo {
                index: 0,
                channels: 2,
                codec_name: "aac".into(),
                measured_bitrate_bps: None,
            }],
        }
    }

    #[test]
    fn test_batch_records_each_outcome() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = CoreConfig {
            output_dir: dir.path().join("out"),
            include_audio: true,
            ..Default::default()
        };

        let good = dir.path().join("good.mkv");
        let missing = dir.path().join("missing.mkv");
        let trimmed_away = dir.path().join("short.mkv");

        let prober = MockFfprobeExecutor::new();
        prober.expect_media(&good, media(Some(60_000)));
        prober.expect_media(&trimmed_away, media(Some(60_000)));

        let encoder = ScriptedEncoder::with_sizes(vec![2_800_000]);
        let tester = MockTestEncoder::default();
        let tools = Collaborators {
            encoder: &encoder,
            tester: &tester,
            prober: &prober,
            metadata: &StdFsMetadataProvider,
        };

        let report = process_videos(&tools, &config, &[good.clone(), missing], &InterruptFlag::new())?;
        assert_eq!(report.files.len(), 2);
        assert!(matches!(report.files[0].outcome, FileOutcome::Success { bytes: 2_800_000, .. }));
        assert!(dir.path().join("out/good.webm").exists());
        assert!(matches!(report.files[1].outcome, FileOutcome::ProbeFailed { .. }));
        assert!(report.has_failures());

        // 3 MiB over 60 s is 419 kbps; stereo aac is re-encoded at 48 kbps per channel
        let first = &encoder.calls()[0];
        assert_eq!(first.audio_plan.total_bitrate_kbps, 96);
        assert_eq!(first.video_bitrate_kbps, 419 - 96);

        let trim_config = CoreConfig {
            start: Some(90.0),
            ..config.clone()
        };
        let report = process_videos(&tools, &trim_config, &[trimmed_away], &InterruptFlag::new())?;
        assert!(matches!(report.files[0].outcome, FileOutcome::ProbeFailed { .. }));
        Ok(())
    }

    #[test]
    fn test_encode_failure_reports_attempts_made() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = CoreConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let input = dir.path().join("a.mkv");
        let prober = MockFfprobeExecutor::new();
        prober.expect_media(&input, media(Some(60_000)));

        // first attempt overshoots, the retry fails
        let encoder = ScriptedEncoder::from_fn(|n, _| {
            if n == 0 {
                Ok(4 * 1024 * 1024)
            } else {
                Err(CoreError::OperationFailed("encoder crashed".into()))
            }
        });
        let tester = MockTestEncoder::default();
        let tools = Collaborators {
            encoder: &encoder,
            tester: &tester,
            prober: &prober,
            metadata: &StdFsMetadataProvider,
        };

        let report = process_videos(&tools, &config, &[input], &InterruptFlag::new())?;
        assert!(matches!(report.files[0].outcome, FileOutcome::EncodeFailed { .. }));
        assert_eq!(report.files[0].attempts, 2);
        Ok(())
    }

    #[test]
    fn test_missing_duration_uses_fallback() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = CoreConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let input = dir.path().join("stream.ts");
        let prober = MockFfprobeExecutor::new();
        prober.expect_media(&input, media(None));

        let encoder = ScriptedEncoder::with_sizes(vec![2_800_000]);
        let tester = MockTestEncoder {
            recovered_duration_ms: Some(120_000),
            ..Default::default()
        };
        let tools = Collaborators {
            encoder: &encoder,
            tester: &tester,
            prober: &prober,
            metadata: &StdFsMetadataProvider,
        };

        process_videos(&tools, &config, &[input], &InterruptFlag::new())?;
        // 3 MiB over 120 s
        assert_eq!(encoder.calls()[0].video_bitrate_kbps, 209);
        Ok(())
    }

    #[test]
    fn test_interrupt_stops_batch() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = CoreConfig {
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let input = dir.path().join("a.mkv");
        let prober = MockFfprobeExecutor::new();
        prober.expect_media(&input, media(Some(60_000)));
        let encoder = ScriptedEncoder::with_sizes(vec![2_800_000]);
        let tester = MockTestEncoder::default();
        let tools = Collaborators {
            encoder: &encoder,
            tester: &tester,
            prober: &prober,
            metadata: &StdFsMetadataProvider,
        };

        let interrupt = InterruptFlag::new();
        interrupt.raise();
        let report = process_videos(&tools, &config, &[input.clone(), input], &interrupt)?;
        assert!(report.interrupted);
        assert!(report.files.is_empty());
        assert!(encoder.calls().is_empty());
        Ok(())
    }
}

//! Implementation of the encode run.
//!
//! Validates the configuration, checks for ffmpeg/ffprobe, wires the core
//! collaborators (real or dry-run) and hands the inputs to
//! `fitenc_core::process_videos`.

use crate::cli::Cli;
use crate::error::{CliErrorContext, CliResult};
use crate::prompt::PromptedSizeProvider;
use crate::terminal;

use fitenc_core::external::{
    self, CrateFfprobeExecutor, DryRunSpawner, Encoder, FfmpegEncoder, FfmpegTestEncoder,
    FileMetadataProvider, SidecarSpawner, StdFsMetadataProvider,
};
use fitenc_core::{BatchReport, Collaborators, CoreConfig, InterruptFlag, format_bytes, process_videos};

use log::{debug, info, warn};
use std::io;
use std::path::Path;
use std::time::Instant;

/// Builds and validates the core configuration.
///
/// Any error here is a `CoreError::Config` and stops the run before logging
/// is set up.
pub fn build_config(cli: &Cli) -> CliResult<CoreConfig> {
    let config = cli.to_core_config();
    config.validate()?;
    Ok(config)
}

/// Raises `interrupt` on Ctrl-C.
fn install_interrupt_handler(interrupt: &InterruptFlag) -> CliResult<()> {
    let flag = interrupt.clone();
    ctrlc::set_handler(move || {
        if !flag.is_raised() {
            warn!("Interrupt received, stopping after the current step");
        }
        flag.raise();
    })
    .map_err(|e| fitenc_core::CoreError::OperationFailed(format!("Failed to install Ctrl-C handler: {e}")))
}

fn display_initialization_info(cli: &Cli, config: &CoreConfig, log_path: &Path) {
    let budget = config.size_budget();
    terminal::print_section("Initialization");
    terminal::print_status("Inputs", &cli.inputs.len().to_string(), false);
    terminal::print_status("Output dir", &config.output_dir.display().to_string(), false);
    terminal::print_status("Log file", &log_path.display().to_string(), false);
    terminal::print_status(
        "Size window",
        &format!("{} - {}", format_bytes(budget.min_bytes), format_bytes(budget.max_bytes)),
        true,
    );
    terminal::print_status(
        "Codecs",
        &format!(
            "{} / {}",
            config.video_codec.encoder_name(),
            if config.include_audio { config.audio_codec.encoder_name() } else { "no audio" }
        ),
        false,
    );
    terminal::print_status("Passes", &config.passes.to_string(), false);
    if config.debug {
        terminal::print_status("Mode", "dry run (commands are logged, sizes typed in)", true);
    }
}

fn run_batch<E, M>(
    cli: &Cli,
    config: &CoreConfig,
    encoder: &E,
    metadata: &M,
    interrupt: &InterruptFlag,
) -> CliResult<BatchReport>
where
    E: Encoder,
    M: FileMetadataProvider,
{
    let prober = CrateFfprobeExecutor::new();
    let tester = FfmpegTestEncoder::new(SidecarSpawner, CrateFfprobeExecutor::new());
    let tools = Collaborators {
        encoder,
        tester: &tester,
        prober: &prober,
        metadata,
    };

    terminal::print_section("Encoding");
    process_videos(&tools, config, &cli.inputs, interrupt)
        .cli_context("Batch could not be processed")
}

/// Runs the whole batch and returns its report.
pub fn run_encode(cli: &Cli, config: &CoreConfig, log_path: &Path) -> CliResult<BatchReport> {
    let started = Instant::now();
    debug!("Run started: {}", chrono::Local::now());
    debug!("Configuration: {config:?}");

    display_initialization_info(cli, config, log_path);

    external::check_dependencies()?;
    terminal::print_success("ffmpeg and ffprobe found");

    let interrupt = InterruptFlag::new();
    install_interrupt_handler(&interrupt)?;

    let report = if config.debug {
        let encoder = FfmpegEncoder::new(DryRunSpawner);
        let sizes = PromptedSizeProvider::new(io::stdin().lock(), io::stdout());
        run_batch(cli, config, &encoder, &sizes, &interrupt)?
    } else {
        let encoder = FfmpegEncoder::new(SidecarSpawner);
        run_batch(cli, config, &encoder, &StdFsMetadataProvider, &interrupt)?
    };

    terminal::print_batch_summary(&report);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!("Batch report:\n{json}"),
        Err(e) => warn!("Could not serialize batch report: {e}"),
    }
    terminal::print_status(
        "Total time",
        &fitenc_core::format_duration_ms(started.elapsed().as_millis() as u64),
        false,
    );
    info!("");
    debug!("Run finished: {}", chrono::Local::now());
    Ok(report)
}

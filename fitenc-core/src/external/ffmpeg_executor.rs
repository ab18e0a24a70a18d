// ============================================================================
// fitenc-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes. Commands are described as structured argument lists
// (FfmpegInvocation) and only turned into an ffmpeg-sidecar command at the
// process boundary, so every argument list can be inspected, logged and
// asserted on in tests.
//
// KEY COMPONENTS:
// - FfmpegInvocation: Structured ffmpeg argument list with a human label
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - DryRunSpawner: Logs invocations without running anything
// - run_ffmpeg: Spawn, drain events, wait and map the exit status

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::collections::VecDeque;
use std::fmt;
use std::process::ExitStatus;

/// Number of ffmpeg error lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

// --- Invocation ---

/// A single ffmpeg command line, without the program name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FfmpegInvocation {
    /// Short description used in logs and error messages ("pass 1/2", "copy test").
    pub label: String,
    pub args: Vec<String>,
}

impl FfmpegInvocation {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds a flag followed by its value.
    pub fn opt(&mut self, flag: &str, value: impl fmt::Display) -> &mut Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    /// The last argument, which is the output target for every command we build.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }

    /// True if any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Returns the value following `flag`, if present.
    #[must_use]
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for FfmpegInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg")?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    fn spawn(&self, invocation: &FfmpegInvocation) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {e}");
            command_failed_error("ffmpeg (event iterator)", ExitStatus::default(), e.to_string())
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, invocation: &FfmpegInvocation) -> CoreResult<Self::Process> {
        let mut cmd = FfmpegCommand::new();
        cmd.args(&invocation.args);
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error(format!("ffmpeg ({})", invocation.label), e))
    }
}

// --- Dry run ---

/// Process handle returned by [`DryRunSpawner`]; emits nothing and succeeds.
pub struct DryRunProcess;

impl FfmpegProcess for DryRunProcess {
    fn handle_events<F>(&mut self, _handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(ExitStatus::default())
    }
}

/// Spawner that only prints the command it was asked to run.
#[derive(Debug, Clone, Default)]
pub struct DryRunSpawner;

impl FfmpegSpawner for DryRunSpawner {
    type Process = DryRunProcess;

    fn spawn(&self, invocation: &FfmpegInvocation) -> CoreResult<Self::Process> {
        log::info!("[dry run] {}: {}", invocation.label, invocation);
        Ok(DryRunProcess)
    }
}

// --- Execution helper ---

/// Runs one ffmpeg invocation to completion.
///
/// Progress is logged at trace level; error lines are collected and attached
/// to the returned error when ffmpeg exits unsuccessfully.
pub fn run_ffmpeg<S: FfmpegSpawner>(spawner: &S, invocation: &FfmpegInvocation) -> CoreResult<()> {
    log::debug!("Running {}: {}", invocation.label, invocation);

    let mut process = spawner.spawn(invocation)?;
    let mut error_lines: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    process.handle_events(|event| {
        match event {
            FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) | FfmpegEvent::Error(line) => {
                if error_lines.len() == STDERR_TAIL_LINES {
                    error_lines.pop_front();
                }
                error_lines.push_back(line);
            }
            FfmpegEvent::Progress(progress) => {
                log::trace!(
                    "{}: time={} frame={} speed={:.2}x",
                    invocation.label,
                    progress.time,
                    progress.frame,
                    progress.speed
                );
            }
            _ => {}
        }
        Ok(())
    })?;

    let status = process.wait()?;
    if !status.success() {
        let stderr = Vec::from(error_lines).join("\n");
        log::error!("ffmpeg ({}) exited with {status}", invocation.label);
        return Err(command_failed_error(
            format!("ffmpeg ({})", invocation.label),
            status,
            stderr,
        ));
    }
    Ok(())
}

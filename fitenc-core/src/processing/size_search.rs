// ============================================================================
// fitenc-core/src/processing/size_search.rs
// ============================================================================
//
// SIZE SEARCH: Iterative bitrate search toward a byte window
//
// The search cycles through rate-control modes (VBR with qmax, VBR, CBR) and
// adjusts the video bitrate after every attempt until the measured output
// size lands in [min_bytes, max_bytes].
//
// KEY COMPONENTS:
// - SearchState: pure state machine; `observe` is its only transition
// - Decision / Transition: what to do next and whether to keep the artifact
// - SizeSearchController: executes decisions through an Encoder
//
// PHASES:
// - Limit: the output is too large. Each mode gets `iterations` encodes,
//   its first one at the originally calculated bitrate. A first retry that
//   lands within 1% of the mode's first size abandons the mode early.
// - Enhance: the output fits but is too small. Up to 2 * `iterations`
//   encodes in the mode that fit, keeping the largest output under the
//   limit.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::FileMetadataProvider;
use crate::external::ffmpeg::Encoder;
use crate::interrupt::InterruptFlag;
use crate::processing::audio::AudioPlan;
use crate::processing::bitrate::{needs_replan, next_bitrate};
use crate::processing::filters::{FilterPlan, FilterPlanner};
use crate::processing::media_info::Geometry;
use crate::processing::params::{AttemptResult, BitrateMode, EncodeJob, EncodeParameters, SizeBudget};
use crate::utils::format_bytes;

use log::{debug, info, warn};
use serde::Serialize;
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Output too large; lowering the bitrate.
    Limit,
    /// Output fits but is below the lower bound; raising the bitrate.
    Enhance,
}

/// Final result of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchOutcome {
    Success { bytes: u64 },
    /// Enhance budget exhausted; the largest fitting artifact was kept.
    TooSmall { bytes: u64 },
    /// Every mode exhausted without fitting under the limit.
    TooLarge,
}

/// Next step requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Encode in `mode` at `bitrate_kbps`, re-planning the filters first when asked.
    Encode {
        mode: BitrateMode,
        bitrate_kbps: u32,
        replan_filters: bool,
    },
    /// Encode the best try again with exactly these parameters.
    ReEncode(EncodeParameters),
    Done(SearchOutcome),
}

/// Result of observing one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Move the attempt's artifact to the output path.
    pub keep: bool,
    pub decision: Decision,
}

/// State of the size search for one input.
#[derive(Debug, Clone)]
pub struct SearchState {
    budget: SizeBudget,
    iterations: u32,
    initial_bitrate: u32,
    mode: BitrateMode,
    phase: Phase,
    iteration_in_mode: u32,
    enhance_encodes: u32,
    last_bitrate: u32,
    mode_first_size: Option<u64>,
    best_try: Option<AttemptResult>,
    best_seq: u32,
    /// Attempt number and size of the artifact currently at the output path.
    retained: Option<(u32, u64)>,
    attempts: u32,
    retain_artifacts: bool,
    reencoding_best: bool,
}

impl SearchState {
    #[must_use]
    pub fn new(budget: SizeBudget, iterations: u32, initial_bitrate: u32, first_mode: BitrateMode) -> Self {
        Self {
            budget,
            iterations: iterations.max(1),
            initial_bitrate: initial_bitrate.max(1),
            mode: first_mode,
            phase: Phase::Limit,
            iteration_in_mode: 0,
            enhance_encodes: 0,
            last_bitrate: initial_bitrate.max(1),
            mode_first_size: None,
            best_try: None,
            best_seq: 0,
            retained: None,
            attempts: 0,
            retain_artifacts: true,
            reencoding_best: false,
        }
    }

    /// Disables artifact retention (dry runs produce no files).
    #[must_use]
    pub fn without_retention(mut self) -> Self {
        self.retain_artifacts = false;
        self
    }

    /// The initial attempt: first mode at the calculated bitrate.
    #[must_use]
    pub fn start(&self) -> Decision {
        Decision::Encode {
            mode: self.mode,
            bitrate_kbps: self.initial_bitrate,
            replan_filters: false,
        }
    }

    pub fn mode(&self) -> BitrateMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn iteration_in_mode(&self) -> u32 {
        self.iteration_in_mode
    }

    pub fn last_bitrate(&self) -> u32 {
        self.last_bitrate
    }

    pub fn best_try(&self) -> Option<&AttemptResult> {
        self.best_try.as_ref()
    }

    pub fn retained_bytes(&self) -> Option<u64> {
        self.retained.map(|(_, bytes)| bytes)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Feeds the result of the attempt requested by the previous decision.
    pub fn observe(&mut self, attempt: AttemptResult) -> Transition {
        self.attempts += 1;
        let seq = self.attempts;
        let size = attempt.output_bytes;
        let fits = self.budget.fits(size);

        let improves_retained = match (self.retained, self.phase) {
            (None, _) => true,
            (Some((_, kept)), Phase::Limit) => size < kept,
            (Some((_, kept)), Phase::Enhance) => size > kept,
        };
        let keep = self.retain_artifacts && fits && (self.reencoding_best || improves_retained);
        if keep {
            self.retained = Some((seq, size));
        }

        if self.reencoding_best {
            self.reencoding_best = false;
            let decision = if self.budget.contains(size) {
                Decision::Done(SearchOutcome::Success { bytes: size })
            } else {
                let bytes = self
                    .retained_bytes()
                    .or_else(|| self.best_try.as_ref().map(|b| b.output_bytes))
                    .unwrap_or(size);
                Decision::Done(SearchOutcome::TooSmall { bytes })
            };
            return Transition { keep, decision };
        }

        if fits && self.best_try.as_ref().is_none_or(|b| size > b.output_bytes) {
            self.best_try = Some(attempt.clone());
            self.best_seq = seq;
        }
        self.last_bitrate = attempt.params.video_bitrate_kbps;

        let decision = if self.budget.contains(size) {
            Decision::Done(SearchOutcome::Success { bytes: size })
        } else {
            match self.phase {
                Phase::Limit => self.after_limit_attempt(size),
                Phase::Enhance => self.after_enhance_attempt(size, seq),
            }
        };
        Transition { keep, decision }
    }

    fn after_limit_attempt(&mut self, size: u64) -> Decision {
        self.iteration_in_mode += 1;

        if self.budget.fits(size) {
            debug!("Output below {} bytes, entering enhance phase", self.budget.min_bytes);
            self.phase = Phase::Enhance;
            self.enhance_encodes = 0;
            return self.adjust(size);
        }

        let first = *self.mode_first_size.get_or_insert(size);
        if self.iteration_in_mode == 2 && within_one_percent(size, first) {
            info!("{} barely changed the output size, moving on", self.mode);
            return self.advance_mode();
        }
        if self.iteration_in_mode >= self.iterations {
            return self.advance_mode();
        }
        self.adjust(size)
    }

    fn after_enhance_attempt(&mut self, size: u64, seq: u32) -> Decision {
        self.enhance_encodes += 1;
        if self.enhance_encodes >= 2 * self.iterations {
            return self.exhaust_enhance(seq);
        }
        self.adjust(size)
    }

    fn adjust(&self, size: u64) -> Decision {
        let next = next_bitrate(self.last_bitrate, size, self.budget.max_bytes);
        Decision::Encode {
            mode: self.mode,
            bitrate_kbps: next,
            replan_filters: needs_replan(self.last_bitrate, next),
        }
    }

    fn advance_mode(&mut self) -> Decision {
        match self.mode.next() {
            Some(next) => {
                self.mode = next;
                self.iteration_in_mode = 0;
                self.mode_first_size = None;
                self.last_bitrate = self.initial_bitrate;
                Decision::Encode {
                    mode: next,
                    bitrate_kbps: self.initial_bitrate,
                    replan_filters: true,
                }
            }
            None => Decision::Done(SearchOutcome::TooLarge),
        }
    }

    fn exhaust_enhance(&mut self, latest_seq: u32) -> Decision {
        let Some(best) = self.best_try.as_ref() else {
            return Decision::Done(SearchOutcome::TooLarge);
        };
        let best_is_retained = self.retained.is_some_and(|(seq, _)| seq == self.best_seq);
        if self.best_seq != latest_seq && !best_is_retained {
            self.reencoding_best = true;
            return Decision::ReEncode(best.params.clone());
        }
        Decision::Done(SearchOutcome::TooSmall {
            bytes: self.retained_bytes().unwrap_or(best.output_bytes),
        })
    }
}

fn within_one_percent(size: u64, reference: u64) -> bool {
    u128::from(size.abs_diff(reference)) * 100 <= u128::from(reference)
}

// ============================================================================
// DRIVER
// ============================================================================

/// Plans fixed for the whole search of one input.
#[derive(Debug, Clone)]
pub struct SearchSetup<'a> {
    pub budget: SizeBudget,
    pub initial_bitrate_kbps: u32,
    /// Geometry handed to the filter planner.
    pub geometry: Geometry,
    pub audio_plan: &'a AudioPlan,
}

/// Record of a finished search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub attempts: Vec<AttemptResult>,
    /// Path of the kept artifact, if any attempt was retained.
    pub output_path: Option<PathBuf>,
}

/// Runs a [`SearchState`] against a real (or scripted) encoder.
pub struct SizeSearchController<'a, E: Encoder, M: FileMetadataProvider> {
    encoder: &'a E,
    metadata: &'a M,
    config: &'a CoreConfig,
    interrupt: &'a InterruptFlag,
    encodes_started: Cell<usize>,
}

impl<'a, E: Encoder, M: FileMetadataProvider> SizeSearchController<'a, E, M> {
    pub fn new(encoder: &'a E, metadata: &'a M, config: &'a CoreConfig, interrupt: &'a InterruptFlag) -> Self {
        Self {
            encoder,
            metadata,
            config,
            interrupt,
            encodes_started: Cell::new(0),
        }
    }

    /// Encoder invocations so far, including one that failed.
    #[must_use]
    pub fn attempts_made(&self) -> usize {
        self.encodes_started.get()
    }

    /// Searches for parameters whose output fits `setup.budget`, moving
    /// improving artifacts to `output`.
    pub fn run(&self, job: &EncodeJob, setup: &SearchSetup<'_>, output: &Path) -> CoreResult<SearchReport> {
        let planner = FilterPlanner::new(self.config);
        let user_filters = job.user_video_filters.as_deref();

        let mut state = SearchState::new(
            setup.budget,
            self.config.iterations,
            setup.initial_bitrate_kbps,
            BitrateMode::first(self.config.skip_qmax),
        );
        if self.config.debug {
            state = state.without_retention();
        }

        let mut filter_plan: FilterPlan = planner.plan(&setup.geometry, setup.initial_bitrate_kbps);
        let mut attempts = Vec::new();
        let mut decision = state.start();

        loop {
            let params = match decision {
                Decision::Encode {
                    mode,
                    bitrate_kbps,
                    replan_filters,
                } => {
                    if replan_filters {
                        filter_plan = planner.plan(&setup.geometry, bitrate_kbps);
                    }
                    EncodeParameters::new(mode, bitrate_kbps, &filter_plan, user_filters, setup.audio_plan)
                }
                Decision::ReEncode(params) => {
                    info!("Re-encoding the best attempt ({} {} kbps)", params.mode, params.video_bitrate_kbps);
                    params
                }
                Decision::Done(outcome) => {
                    return Ok(SearchReport {
                        outcome,
                        attempts,
                        output_path: state.retained_bytes().map(|_| output.to_path_buf()),
                    });
                }
            };

            self.interrupt.check()?;

            let number = state.attempts() + 1;
            let scratch = job.workspace.join(format!("attempt_{number:02}.webm"));
            self.encodes_started.set(self.encodes_started.get() + 1);
            if let Err(e) = self.encoder.encode(job, &params, &scratch) {
                if scratch.exists() {
                    if let Err(remove_err) = std::fs::remove_file(&scratch) {
                        warn!("Failed to remove {}: {remove_err}", scratch.display());
                    }
                }
                self.interrupt.check()?;
                return Err(e);
            }

            let output_bytes = self.metadata.get_size(&scratch)?;
            info!(
                "Attempt {number}: {} {} kbps, {}p @ {} fps -> {} ({output_bytes} bytes)",
                params.mode,
                params.video_bitrate_kbps,
                params.out_height,
                params.out_frame_rate,
                format_bytes(output_bytes),
            );

            let mut attempt = AttemptResult {
                params,
                output_bytes,
                kept_artifact_path: None,
            };
            let transition = state.observe(attempt.clone());

            if transition.keep {
                promote(&scratch, output)?;
                attempt.kept_artifact_path = Some(output.to_path_buf());
            } else if scratch.exists() {
                if let Err(e) = std::fs::remove_file(&scratch) {
                    warn!("Failed to remove {}: {e}", scratch.display());
                }
            }
            attempts.push(attempt);
            decision = transition.decision;
        }
    }
}

/// Moves an attempt artifact to its final location.
fn promote(scratch: &Path, output: &Path) -> CoreResult<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(scratch, output).is_err() {
        // Workspace on another file system.
        std::fs::copy(scratch, output).map_err(CoreError::Io)?;
        std::fs::remove_file(scratch)?;
    }
    debug!("Kept {} as {}", scratch.display(), output.display());
    Ok(())
}

// fitenc-core/src/external/mocks.rs
//
// --- Mocking Infrastructure (for testing) ---
//
// Compiled for unit tests and when the "test-mocks" feature is enabled.

use super::ffmpeg::{Encoder, TestEncoder};
use super::ffmpeg_executor::{FfmpegInvocation, FfmpegProcess, FfmpegSpawner};
use super::ffprobe_executor::FfprobeExecutor;
use crate::error::{CoreError, CoreResult};
use crate::processing::media_info::{Geometry, MediaInfo};
use crate::processing::params::{EncodeJob, EncodeParameters};
use ffmpeg_sidecar::event::FfmpegEvent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let events = self.events_to_emit.borrow().clone();
        for event in events {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

/// Represents an expected ffmpeg invocation and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
    /// Size of a dummy output file created at the invocation's output path.
    pub dummy_output_bytes: Option<u64>,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each expectation matches the first invocation with an argument
/// containing its pattern and is consumed by it.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<FfmpegInvocation>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        dummy_output_bytes: Option<u64>,
    ) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result: Ok(MockFfmpegProcess {
                events_to_emit: Rc::new(RefCell::new(events)),
                exit_status: ExitStatus::from_raw(0),
            }),
            dummy_output_bytes,
        });
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result: Err(error),
            dummy_output_bytes: None,
        });
    }

    pub fn add_exit_error_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result: Ok(MockFfmpegProcess {
                events_to_emit: Rc::new(RefCell::new(events)),
                exit_status: ExitStatus::from_raw(exit_code << 8),
            }),
            dummy_output_bytes: None,
        });
    }

    pub fn get_received_calls(&self) -> Vec<FfmpegInvocation> {
        self.received_calls.borrow().clone()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, invocation: &FfmpegInvocation) -> CoreResult<Self::Process> {
        self.received_calls.borrow_mut().push(invocation.clone());

        let mut expectations = self.expectations.borrow_mut();
        let found_index = expectations
            .iter()
            .position(|exp| invocation.args.iter().any(|arg| arg.contains(&exp.arg_pattern)));

        let Some(index) = found_index else {
            panic!("MockFfmpegSpawner: No expectation found for invocation: {invocation}");
        };
        let expectation = expectations.remove(index);
        log::debug!(
            "MockFfmpegSpawner: Matched expectation with pattern '{}'",
            expectation.arg_pattern
        );

        if let (Ok(_), Some(bytes)) = (&expectation.result, expectation.dummy_output_bytes) {
            if let Some(output) = invocation.output().filter(|o| *o != "-") {
                write_sized_file(Path::new(output), bytes);
            }
        }
        expectation.result
    }
}

/// Creates (or truncates) `path` with exactly `bytes` bytes.
pub fn write_sized_file(path: &Path, bytes: u64) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = std::fs::File::create(path).expect("mock output file can be created");
    file.set_len(bytes).expect("mock output file can be sized");
}

/// Mock implementation of FfprobeExecutor.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    media_results: Rc<RefCell<HashMap<PathBuf, MediaInfo>>>,
    duration_results: Rc<RefCell<HashMap<PathBuf, Option<u64>>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn expect_media(&self, input_path: &Path, info: MediaInfo) {
        self.media_results
            .borrow_mut()
            .insert(input_path.to_path_buf(), info);
    }

    pub fn expect_duration(&self, input_path: &Path, duration_ms: Option<u64>) {
        self.duration_results
            .borrow_mut()
            .insert(input_path.to_path_buf(), duration_ms);
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe_media(&self, input_path: &Path) -> CoreResult<MediaInfo> {
        self.media_results
            .borrow()
            .get(input_path)
            .cloned()
            .ok_or_else(|| {
                CoreError::VideoInfoError(format!(
                    "MockFfprobeExecutor: No expectation set for path {}",
                    input_path.display()
                ))
            })
    }

    fn probe_duration(&self, input_path: &Path) -> CoreResult<Option<u64>> {
        // Scratch files carry random names, so fall back to the first entry.
        let results = self.duration_results.borrow();
        Ok(results
            .get(input_path)
            .copied()
            .or_else(|| results.values().next().copied())
            .flatten())
    }
}

/// Scripted TestEncoder with fixed answers and call counters.
#[derive(Default)]
pub struct MockTestEncoder {
    pub audio_bitrates_bps: HashMap<usize, u64>,
    pub opus_ok: bool,
    pub recovered_duration_ms: Option<u64>,
    pub filtered: Option<Geometry>,
    pub copy_tests: Cell<usize>,
    pub opus_tests: Cell<usize>,
}

impl TestEncoder for MockTestEncoder {
    fn measure_audio_bitrate(&self, _input: &Path, _workspace: &Path, stream_index: usize) -> CoreResult<Option<u64>> {
        self.copy_tests.set(self.copy_tests.get() + 1);
        Ok(self.audio_bitrates_bps.get(&stream_index).copied())
    }

    fn opus_supported(&self, _input: &Path, _workspace: &Path, _stream_index: usize) -> CoreResult<bool> {
        self.opus_tests.set(self.opus_tests.get() + 1);
        Ok(self.opus_ok)
    }

    fn measure_duration(&self, _input: &Path, _workspace: &Path) -> CoreResult<Option<u64>> {
        Ok(self.recovered_duration_ms)
    }

    fn filtered_geometry(&self, input: &Path, _workspace: &Path, _filters: &str) -> CoreResult<Geometry> {
        self.filtered.ok_or_else(|| {
            CoreError::VideoInfoError(format!("no filtered geometry for {}", input.display()))
        })
    }
}

type SizeModel = Box<dyn Fn(usize, &EncodeParameters) -> CoreResult<u64>>;

/// Encoder that writes outputs of scripted sizes instead of running ffmpeg.
pub struct ScriptedEncoder {
    model: SizeModel,
    calls: RefCell<Vec<EncodeParameters>>,
}

impl ScriptedEncoder {
    /// Produces the given sizes in order; extra attempts repeat the last one.
    pub fn with_sizes(sizes: Vec<u64>) -> Self {
        Self::from_fn(move |n, _| Ok(sizes.get(n).or(sizes.last()).copied().unwrap_or(0)))
    }

    /// Derives each size from the attempt number and its parameters.
    pub fn from_fn(model: impl Fn(usize, &EncodeParameters) -> CoreResult<u64> + 'static) -> Self {
        Self {
            model: Box::new(model),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<EncodeParameters> {
        self.calls.borrow().clone()
    }
}

impl Encoder for ScriptedEncoder {
    fn encode(&self, _job: &EncodeJob, params: &EncodeParameters, output: &Path) -> CoreResult<()> {
        let attempt = self.calls.borrow().len();
        self.calls.borrow_mut().push(params.clone());
        let bytes = (self.model)(attempt, params)?;
        write_sized_file(output, bytes);
        Ok(())
    }
}

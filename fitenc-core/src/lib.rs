//! Core library for size-targeted WebM encoding using ffmpeg and ffprobe.
//!
//! This crate probes inputs, plans audio and video parameters from a byte
//! budget and drives ffmpeg through an iterative size search until each
//! output lands inside `[min_bytes, max_bytes]`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use fitenc_core::config::CoreConfigBuilder;
//! use fitenc_core::external::{
//!     CrateFfprobeExecutor, FfmpegEncoder, FfmpegTestEncoder, SidecarSpawner,
//!     StdFsMetadataProvider,
//! };
//! use fitenc_core::{Collaborators, InterruptFlag, process_videos};
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .output_dir(PathBuf::from("webm_done"))
//!     .size_limit_mib(4.0)
//!     .build();
//! config.validate().unwrap();
//!
//! let encoder = FfmpegEncoder::new(SidecarSpawner);
//! let tester = FfmpegTestEncoder::new(SidecarSpawner, CrateFfprobeExecutor::new());
//! let tools = Collaborators {
//!     encoder: &encoder,
//!     tester: &tester,
//!     prober: &CrateFfprobeExecutor::new(),
//!     metadata: &StdFsMetadataProvider,
//! };
//!
//! let report = process_videos(
//!     &tools,
//!     &config,
//!     &[PathBuf::from("clip.mp4")],
//!     &InterruptFlag::new(),
//! ).unwrap();
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod external;
pub mod interrupt;
pub mod processing;
pub mod reporting;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use interrupt::InterruptFlag;
pub use processing::{Collaborators, process_videos};
pub use reporting::{BatchReport, FileOutcome, FileReport};
pub use utils::{format_bytes, format_duration_ms};

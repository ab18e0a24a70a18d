//! Core processing logic and orchestration.
//!
//! This module organizes the planners, the size search and the batch loop
//! into submodules and exposes the primary entry point.

/// Batch orchestration
pub mod video;

/// Audio stream planning
pub mod audio;

/// Initial video bitrate and the adjustment rule
pub mod bitrate;

/// Downscaling and frame-rate reduction
pub mod filters;

/// Probed media properties and trim windows
pub mod media_info;

/// Values shared by planners, encoder and search
pub mod params;

/// Iterative size search state machine and driver
pub mod size_search;

pub use video::{Collaborators, process_videos};

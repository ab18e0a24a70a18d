// ============================================================================
// fitenc-core/src/processing/filters.rs
// ============================================================================
//
// FILTER PLANNER: Downscaling and frame-rate reduction
//
// Chooses an output height and frame rate that keep the bits-per-pixel of the
// planned video bitrate above the configured floor:
//
//   bpp = bitrate * 1000 / (height^2 * aspect_ratio * fps)
//
// The height is lowered in 10 px steps down to twice the minimum height
// threshold; if that is not enough the frame rate drops to 24 fps (inputs
// already at or below 24 fps keep their rate), after which the height may
// continue down to the threshold. The result is clamped into the user bounds
// and the input's own geometry, then made even without leaving those bounds.

use crate::config::CoreConfig;
use crate::processing::media_info::{FrameRate, Geometry};
use serde::{Deserialize, Serialize};

/// Height decrement of each planning step, in pixels.
const HEIGHT_STEP: u32 = 10;

/// Frame rate the planner falls back to when downscaling is not enough.
const REDUCED_FPS: f64 = 24.0;

/// Output geometry chosen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPlan {
    pub out_height: u32,
    pub out_frame_rate: FrameRate,
    /// Automatic filter descriptors (`scale=...`, `fps=...`), in order.
    pub auto_filters: Vec<String>,
}

impl FilterPlan {
    /// Plan that keeps the given geometry untouched.
    #[must_use]
    pub fn passthrough(geometry: &Geometry) -> Self {
        Self {
            out_height: geometry.height,
            out_frame_rate: geometry.frame_rate,
            auto_filters: Vec::new(),
        }
    }

    /// Joins the user chain and the automatic filters into one filter graph.
    #[must_use]
    pub fn merged_graph(&self, user_filters: Option<&str>) -> Option<String> {
        let parts: Vec<&str> = user_filters
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .into_iter()
            .chain(self.auto_filters.iter().map(String::as_str))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

/// Plans output height and frame rate for a given video bitrate.
#[derive(Debug, Clone)]
pub struct FilterPlanner {
    bpp_threshold: f64,
    min_height_threshold: u32,
    user_min_height: Option<u32>,
    user_max_height: Option<u32>,
    min_fps: f64,
    max_fps: Option<f64>,
    bypass: bool,
}

impl FilterPlanner {
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            bpp_threshold: config.bpp_threshold,
            min_height_threshold: config.min_height_threshold,
            user_min_height: config.min_height,
            user_max_height: config.max_height,
            min_fps: config.min_fps,
            max_fps: config.max_fps,
            bypass: config.user_scale || config.user_fps,
        }
    }

    /// True when the user's filters own scaling and frame rate.
    #[must_use]
    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Plans the output for `geometry` at `bitrate_kbps`.
    ///
    /// When bypassed, `geometry` is expected to be the geometry produced by
    /// the user's filter chain and is returned unchanged.
    #[must_use]
    pub fn plan(&self, geometry: &Geometry, bitrate_kbps: u32) -> FilterPlan {
        if self.bypass {
            return FilterPlan::passthrough(geometry);
        }

        let aspect = geometry.aspect_ratio();
        let input_fps = geometry.frame_rate.as_f64();
        let bpp = |height: u32, fps: f64| -> f64 {
            let h = f64::from(height);
            f64::from(bitrate_kbps) * 1000.0 / (h * h * aspect * fps)
        };

        let mut height = geometry.height;
        let mut rate = geometry.frame_rate;

        while bpp(height, rate.as_f64()) < self.bpp_threshold
            && height > 2 * self.min_height_threshold
        {
            height = height.saturating_sub(HEIGHT_STEP);
        }

        if bpp(height, rate.as_f64()) < self.bpp_threshold && input_fps >= REDUCED_FPS {
            let target = REDUCED_FPS.max(self.min_fps).min(input_fps);
            if target < input_fps {
                rate = FrameRate::from_f64(target);
            }
        }

        while bpp(height, rate.as_f64()) < self.bpp_threshold
            && height > self.min_height_threshold
        {
            height = height.saturating_sub(HEIGHT_STEP);
        }

        height = self.clamp_height(height, geometry.height);
        rate = self.clamp_frame_rate(rate, geometry.frame_rate);

        let mut auto_filters = Vec::new();
        if height != geometry.height {
            auto_filters.push(format!("scale=-2:{height}:flags=lanczos"));
        }
        if rate != geometry.frame_rate {
            auto_filters.push(format!("fps={rate}"));
        }

        log::debug!(
            "Filter plan at {bitrate_kbps} kbps: height {} -> {height}, fps {} -> {rate}",
            geometry.height,
            geometry.frame_rate
        );

        FilterPlan {
            out_height: height,
            out_frame_rate: rate,
            auto_filters,
        }
    }

    /// Clamps into the height bounds and rounds a scaled height to an even value.
    fn clamp_height(&self, height: u32, input_height: u32) -> u32 {
        let lower = self
            .min_height_threshold
            .max(self.user_min_height.unwrap_or(0));
        let upper = input_height.min(self.user_max_height.unwrap_or(u32::MAX));
        if lower > upper {
            return upper;
        }
        let height = height.clamp(lower, upper);
        if height == input_height || height % 2 == 0 {
            height
        } else if height > lower {
            height - 1
        } else if height < upper {
            height + 1
        } else {
            // lower == upper and odd
            height
        }
    }

    fn clamp_frame_rate(&self, rate: FrameRate, input_rate: FrameRate) -> FrameRate {
        let input_fps = input_rate.as_f64();
        let mut fps = rate.as_f64().min(input_fps);
        if let Some(max_fps) = self.max_fps {
            fps = fps.min(max_fps);
        }
        fps = fps.max(self.min_fps.min(input_fps));

        if (fps - input_fps).abs() < f64::EPSILON {
            input_rate
        } else if (fps - rate.as_f64()).abs() < f64::EPSILON {
            rate
        } else {
            FrameRate::from_f64(fps)
        }
    }
}

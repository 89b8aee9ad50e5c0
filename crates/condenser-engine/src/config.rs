//! Configuration for the rally detection engine.
//!
//! Defaults are the settings proven on standard roundnet footage. Every
//! session validates its configuration before the first frame is accepted.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::state_machine::FORCE_CUT_REWIND_SECS;

/// Tunable engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Sampling ===
    /// Frame rate frames are normalized to before processing, so energy
    /// values are comparable across sources (default: 30.0)
    pub process_fps: f64,

    /// Downscale width used for inference (default: 640)
    pub process_width: u32,

    /// Frames skipped between processed frames at `process_fps` (default: 2)
    pub skip_frames: u32,

    // === Timing buffers (seconds) ===
    /// Included before the detected serve to capture the setup (default: 4.0)
    pub pre_serve_buffer: f64,

    /// Added after the point ends; negative values trim the tail (default: -1.0)
    pub post_point_buffer: f64,

    // === Detection logic ===
    /// Occupied zones required to arm the detector (default: 2)
    pub min_occupied_zones: usize,

    /// Seconds players must hold position before the serve is armed (default: 2.5)
    pub min_hold_duration: f64,

    /// Minimum seconds before a point can be promoted or cut (default: 2.5)
    pub min_point_duration: f64,

    /// Seconds of sustained low energy that end a point (default: 2.5)
    pub min_low_energy_duration: f64,

    // === Energy thresholds ===
    /// Added to the measured noise floor (default: 15.0)
    pub base_sensitivity: f64,

    /// Lower bound of the calibrated threshold (default: 60.0)
    pub min_dynamic_threshold: f64,

    /// Upper bound of the calibrated threshold (default: 60.0)
    pub max_dynamic_threshold: f64,

    // === Clip tagging ===
    /// Peak energy above this is a Rally (default: 80.0)
    pub rally_energy_req: f64,

    /// Peak energy below this is Noise (default: 55.0)
    pub walk_energy_cap: f64,

    /// Exponential smoothing factor, `smooth = raw * a + prev * (1 - a)` (default: 0.3)
    pub energy_smoothing_factor: f64,

    // === Pose ===
    /// Minimum keypoint confidence (default: 0.5)
    pub keypoint_confidence_threshold: f64,

    /// Maximum pixel distance for matching skeletons between frames (default: 100.0)
    pub max_skeleton_match_distance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            process_fps: 30.0,
            process_width: 640,
            skip_frames: 2,

            pre_serve_buffer: 4.0,
            post_point_buffer: -1.0,

            min_occupied_zones: 2,
            min_hold_duration: 2.5,
            min_point_duration: 2.5,
            min_low_energy_duration: 2.5,

            base_sensitivity: 15.0,
            min_dynamic_threshold: 60.0,
            max_dynamic_threshold: 60.0,

            rally_energy_req: 80.0,
            walk_energy_cap: 55.0,
            energy_smoothing_factor: 0.3,

            keypoint_confidence_threshold: 0.5,
            max_skeleton_match_distance: 100.0,
        }
    }
}

impl EngineConfig {
    /// Fast configuration: skips more frames, lower accuracy.
    pub fn fast() -> Self {
        Self {
            skip_frames: 4,
            ..Default::default()
        }
    }

    /// Parse a (possibly partial) configuration from JSON. Missing fields
    /// keep their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Apply `CONDENSER_*` environment overrides on top of this config.
    ///
    /// Unset or unparsable variables leave the current value untouched.
    pub fn with_env_overrides(self) -> Self {
        Self {
            process_fps: env_or("CONDENSER_PROCESS_FPS", self.process_fps),
            process_width: env_or("CONDENSER_PROCESS_WIDTH", self.process_width),
            skip_frames: env_or("CONDENSER_SKIP_FRAMES", self.skip_frames),
            pre_serve_buffer: env_or("CONDENSER_PRE_SERVE_BUFFER", self.pre_serve_buffer),
            post_point_buffer: env_or("CONDENSER_POST_POINT_BUFFER", self.post_point_buffer),
            min_occupied_zones: env_or("CONDENSER_MIN_OCCUPIED_ZONES", self.min_occupied_zones),
            min_hold_duration: env_or("CONDENSER_MIN_HOLD_DURATION", self.min_hold_duration),
            min_point_duration: env_or("CONDENSER_MIN_POINT_DURATION", self.min_point_duration),
            min_low_energy_duration: env_or(
                "CONDENSER_MIN_LOW_ENERGY_DURATION",
                self.min_low_energy_duration,
            ),
            base_sensitivity: env_or("CONDENSER_BASE_SENSITIVITY", self.base_sensitivity),
            min_dynamic_threshold: env_or(
                "CONDENSER_MIN_DYNAMIC_THRESHOLD",
                self.min_dynamic_threshold,
            ),
            max_dynamic_threshold: env_or(
                "CONDENSER_MAX_DYNAMIC_THRESHOLD",
                self.max_dynamic_threshold,
            ),
            rally_energy_req: env_or("CONDENSER_RALLY_ENERGY_REQ", self.rally_energy_req),
            walk_energy_cap: env_or("CONDENSER_WALK_ENERGY_CAP", self.walk_energy_cap),
            energy_smoothing_factor: env_or(
                "CONDENSER_ENERGY_SMOOTHING_FACTOR",
                self.energy_smoothing_factor,
            ),
            keypoint_confidence_threshold: env_or(
                "CONDENSER_KEYPOINT_CONFIDENCE_THRESHOLD",
                self.keypoint_confidence_threshold,
            ),
            max_skeleton_match_distance: env_or(
                "CONDENSER_MAX_SKELETON_MATCH_DISTANCE",
                self.max_skeleton_match_distance,
            ),
        }
    }

    /// Builder-style setter for the pre-serve buffer.
    pub fn with_pre_serve_buffer(mut self, secs: f64) -> Self {
        self.pre_serve_buffer = secs;
        self
    }

    /// Builder-style setter for the post-point buffer.
    pub fn with_post_point_buffer(mut self, secs: f64) -> Self {
        self.post_point_buffer = secs;
        self
    }

    /// Builder-style setter for the zone arming minimum.
    pub fn with_min_occupied_zones(mut self, zones: usize) -> Self {
        self.min_occupied_zones = zones;
        self
    }

    /// Builder-style setter for frame skipping.
    pub fn with_skip_frames(mut self, skip: u32) -> Self {
        self.skip_frames = skip;
        self
    }

    /// Builder-style setter for the inference width.
    pub fn with_process_width(mut self, width: u32) -> Self {
        self.process_width = width;
        self
    }

    /// Check every option, failing on the first invalid one.
    pub fn validate(&self) -> EngineResult<()> {
        for (field, value) in [
            ("process_fps", self.process_fps),
            ("pre_serve_buffer", self.pre_serve_buffer),
            ("post_point_buffer", self.post_point_buffer),
            ("min_hold_duration", self.min_hold_duration),
            ("min_point_duration", self.min_point_duration),
            ("min_low_energy_duration", self.min_low_energy_duration),
            ("base_sensitivity", self.base_sensitivity),
            ("min_dynamic_threshold", self.min_dynamic_threshold),
            ("max_dynamic_threshold", self.max_dynamic_threshold),
            ("rally_energy_req", self.rally_energy_req),
            ("walk_energy_cap", self.walk_energy_cap),
            ("energy_smoothing_factor", self.energy_smoothing_factor),
            ("keypoint_confidence_threshold", self.keypoint_confidence_threshold),
            ("max_skeleton_match_distance", self.max_skeleton_match_distance),
        ] {
            if !value.is_finite() {
                return Err(EngineError::invalid_config(
                    field,
                    format!("must be finite, got {}", value),
                ));
            }
        }
        if !(self.process_fps > 0.0) {
            return Err(EngineError::invalid_config("process_fps", "must be > 0"));
        }
        if self.process_width < 100 {
            return Err(EngineError::invalid_config("process_width", "must be >= 100"));
        }
        if !(self.energy_smoothing_factor > 0.0 && self.energy_smoothing_factor <= 1.0) {
            return Err(EngineError::invalid_config(
                "energy_smoothing_factor",
                "must be in (0, 1]",
            ));
        }
        if self.min_dynamic_threshold > self.max_dynamic_threshold {
            return Err(EngineError::invalid_config(
                "min_dynamic_threshold",
                format!(
                    "{} exceeds max_dynamic_threshold {}",
                    self.min_dynamic_threshold, self.max_dynamic_threshold
                ),
            ));
        }
        if self.min_occupied_zones == 0 {
            return Err(EngineError::invalid_config("min_occupied_zones", "must be >= 1"));
        }
        for (field, value) in [
            ("min_hold_duration", self.min_hold_duration),
            ("min_point_duration", self.min_point_duration),
            ("min_low_energy_duration", self.min_low_energy_duration),
            ("pre_serve_buffer", self.pre_serve_buffer),
        ] {
            if !(value >= 0.0) {
                return Err(EngineError::invalid_config(field, "must be >= 0"));
            }
        }
        if !(0.0..=1.0).contains(&self.keypoint_confidence_threshold) {
            return Err(EngineError::invalid_config(
                "keypoint_confidence_threshold",
                "must be in [0, 1]",
            ));
        }
        if !(self.max_skeleton_match_distance > 0.0) {
            return Err(EngineError::invalid_config("max_skeleton_match_distance", "must be > 0"));
        }
        if self.walk_energy_cap > self.rally_energy_req {
            return Err(EngineError::invalid_config(
                "walk_energy_cap",
                format!("{} exceeds rally_energy_req {}", self.walk_energy_cap, self.rally_energy_req),
            ));
        }
        // A clip closed at the earliest possible moment must still end after it starts.
        if self.min_point_duration + self.post_point_buffer <= 0.0 {
            return Err(EngineError::invalid_config(
                "post_point_buffer",
                "would end clips before the serve (min_point_duration + post_point_buffer <= 0)",
            ));
        }
        if self.min_point_duration + self.pre_serve_buffer <= FORCE_CUT_REWIND_SECS {
            return Err(EngineError::invalid_config(
                "min_point_duration",
                "too short for the force-cut rewind",
            ));
        }

        debug!(config = ?self, "Engine configuration validated");
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, current: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(current)
}

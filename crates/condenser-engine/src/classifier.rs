//! Traffic-light clip classification.
//!
//! - Green: peak energy above `rally_energy_req` -> Rally / High
//! - Red: peak energy below `walk_energy_cap` -> Noise / Low
//! - Yellow: anything in between -> Serve / Medium

use condenser_models::{ClipTag, Confidence};

use crate::config::EngineConfig;

/// Assigns tag and confidence from a clip's peak smoothed energy.
#[derive(Debug, Clone, Copy)]
pub struct ClipClassifier {
    rally_energy_req: f64,
    walk_energy_cap: f64,
}

impl ClipClassifier {
    pub fn new(rally_energy_req: f64, walk_energy_cap: f64) -> Self {
        Self {
            rally_energy_req,
            walk_energy_cap,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.rally_energy_req, config.walk_energy_cap)
    }

    /// Classify a closed clip.
    ///
    /// `_duration` is accepted so callers always pass it, but it does not
    /// influence the result yet; only peak energy decides.
    pub fn classify(&self, _duration: f64, peak_energy: f64) -> (ClipTag, Confidence) {
        let tag = if peak_energy > self.rally_energy_req {
            ClipTag::Rally
        } else if peak_energy < self.walk_energy_cap {
            ClipTag::Noise
        } else {
            ClipTag::Serve
        };
        (tag, tag.confidence())
    }
}

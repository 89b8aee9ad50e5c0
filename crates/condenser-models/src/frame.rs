//! Per-frame detector output consumed by the engine.
//!
//! A frame arrives either as already-derived points (hip centres and
//! ankles) or as raw COCO-17 keypoints per detected person. Both shapes
//! share one JSON Lines stream, one record per processed frame.

use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult, Point};

/// One pose keypoint, serialized as `[x, y, confidence]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<[f64; 3]> for Keypoint {
    fn from([x, y, confidence]: [f64; 3]) -> Self {
        Self { x, y, confidence }
    }
}

impl From<Keypoint> for [f64; 3] {
    fn from(k: Keypoint) -> Self {
        [k.x, k.y, k.confidence]
    }
}

/// All keypoints of one detected person, in model index order.
pub type PersonKeypoints = Vec<Keypoint>;

/// Derived detector output for one processed frame.
///
/// Unknown keys are rejected so a malformed pose line or a misspelled
/// `hips`/`ankles` key never reads as an empty frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameObservation {
    /// Source frame index (1-based, as counted by the decoder).
    pub frame: u64,

    /// Timestamp in seconds. Derived from `frame / fps` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Ankle points in processing-resolution pixels.
    #[serde(default)]
    pub ankles: Vec<Point>,

    /// Hip-centre points, one per confidently detected person.
    #[serde(default)]
    pub hips: Vec<Point>,

    /// Detected skeleton count. Defaults to the number of hip centres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton_count: Option<usize>,
}

impl FrameObservation {
    pub fn new(frame: u64, ankles: Vec<Point>, hips: Vec<Point>) -> Self {
        Self {
            frame,
            timestamp: None,
            ankles,
            hips,
            skeleton_count: None,
        }
    }

    /// Builder-style setter for an explicit timestamp.
    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Number of skeletons visible in this frame.
    pub fn skeleton_count(&self) -> usize {
        self.skeleton_count.unwrap_or(self.hips.len())
    }
}

/// Raw pose output for one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseFrame {
    pub frame: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub poses: Vec<PersonKeypoints>,
}

/// One line of a frame stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameInput {
    /// Raw keypoints; must be reduced to hips/ankles before use.
    Poses(PoseFrame),
    /// Already-derived hips and ankles.
    Observation(FrameObservation),
}

impl FrameInput {
    /// Parse one JSON Lines record. `line` is 1-based and only used for errors.
    pub fn parse_line(line: usize, text: &str) -> ModelResult<Self> {
        serde_json::from_str(text).map_err(|e| ModelError::invalid_frame(line, e.to_string()))
    }

    /// Source frame index of this record.
    pub fn frame(&self) -> u64 {
        match self {
            FrameInput::Poses(p) => p.frame,
            FrameInput::Observation(o) => o.frame,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            FrameInput::Poses(p) => p.timestamp,
            FrameInput::Observation(o) => o.timestamp,
        }
    }
}

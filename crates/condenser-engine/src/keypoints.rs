//! COCO-17 keypoint extraction.
//!
//! Reduces full pose estimates to the two signals the engine consumes:
//! ankle positions (zone occupancy) and hip centres (movement energy).

use condenser_models::{FrameObservation, Keypoint, PersonKeypoints, Point, PoseFrame};

use crate::config::EngineConfig;

/// COCO keypoint indices used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    LeftHip = 11,
    RightHip = 12,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    /// Keypoints per person in the COCO layout.
    pub const COUNT: usize = 17;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Confidence-gated extraction of ankles and hip centres.
#[derive(Debug, Clone, Copy)]
pub struct KeypointExtractor {
    confidence_threshold: f64,
}

impl KeypointExtractor {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.keypoint_confidence_threshold)
    }

    fn confident(&self, person: &PersonKeypoints, idx: KeypointIndex) -> Option<Keypoint> {
        person
            .get(idx.index())
            .copied()
            .filter(|kp| kp.confidence > self.confidence_threshold)
    }

    /// Hip centre, present only when both hips are confident.
    pub fn hip_center(&self, person: &PersonKeypoints) -> Option<Point> {
        let left = self.confident(person, KeypointIndex::LeftHip)?;
        let right = self.confident(person, KeypointIndex::RightHip)?;
        Some(left.point().midpoint(&right.point()))
    }

    /// Confident ankles, each one independently.
    pub fn ankles(&self, person: &PersonKeypoints) -> Vec<Point> {
        [KeypointIndex::LeftAnkle, KeypointIndex::RightAnkle]
            .into_iter()
            .filter_map(|idx| self.confident(person, idx))
            .map(|kp| kp.point())
            .collect()
    }

    /// Reduce a pose frame to an observation. Skeleton count = hip centres found.
    pub fn extract(&self, frame: &PoseFrame) -> FrameObservation {
        let mut ankles = Vec::new();
        let mut hips = Vec::new();

        for person in &frame.poses {
            if let Some(hip) = self.hip_center(person) {
                hips.push(hip);
            }
            ankles.extend(self.ankles(person));
        }

        let mut observation = FrameObservation::new(frame.frame, ankles, hips);
        observation.timestamp = frame.timestamp;
        observation
    }
}

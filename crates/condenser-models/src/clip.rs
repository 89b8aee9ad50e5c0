//! Clip descriptors and traffic-light classification labels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tag assigned to a closed clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClipTag {
    /// Sustained high-energy play (green).
    Rally,
    /// Moderate energy, usually a serve without a long rally (yellow).
    Serve,
    /// Low energy, most likely players walking around (red).
    Noise,
}

impl ClipTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipTag::Rally => "Rally",
            ClipTag::Serve => "Serve",
            ClipTag::Noise => "Noise",
        }
    }

    /// Confidence level paired with this tag.
    pub fn confidence(&self) -> Confidence {
        match self {
            ClipTag::Rally => Confidence::High,
            ClipTag::Serve => Confidence::Medium,
            ClipTag::Noise => Confidence::Low,
        }
    }
}

impl fmt::Display for ClipTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence level attached to a clip tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round seconds to millisecond precision.
pub fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// A completed clip as produced by the state machine.
///
/// Times are kept at full precision; rounding happens only when the clip
/// is converted to a [`ClipRecord`] for output.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// Clip start in seconds, pre-serve buffer already applied.
    pub start: f64,
    /// Clip end in seconds, post-point buffer already applied.
    pub end: f64,
    pub tag: ClipTag,
    pub confidence: Confidence,
    /// Peak smoothed energy during the clip, truncated to an integer.
    pub peak_energy: i64,
}

impl ClipInfo {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Output form with millisecond-rounded times.
    pub fn to_record(&self) -> ClipRecord {
        ClipRecord {
            start: round_millis(self.start),
            end: round_millis(self.end),
            duration: round_millis(self.duration()),
            tag: self.tag,
            confidence: self.confidence,
            peak_energy: self.peak_energy,
        }
    }
}

/// Serialized clip entry in the clip report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub tag: ClipTag,
    pub confidence: Confidence,
    pub peak_energy: i64,
}

impl From<&ClipInfo> for ClipRecord {
    fn from(clip: &ClipInfo) -> Self {
        clip.to_record()
    }
}

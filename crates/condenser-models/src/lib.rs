//! Shared data models for the Roundnet Condenser.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel points and zone polygon files
//! - Per-frame observations (hip centres, ankles, raw pose keypoints)
//! - Clip descriptors with traffic-light classification
//! - The clip report written for downstream renderers

pub mod clip;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod report;
pub mod zone_file;

// Re-export common types
pub use clip::{round_millis, ClipInfo, ClipRecord, ClipTag, Confidence};
pub use error::{ModelError, ModelResult};
pub use frame::{FrameInput, FrameObservation, Keypoint, PersonKeypoints, PoseFrame};
pub use geometry::{Point, Vertex};
pub use report::{ClipReport, ClipSummary, Resolution, VideoProps};
pub use zone_file::ZoneFile;

//! Clip report artifact and source video properties.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClipRecord, ClipTag};

/// Properties of the source video, supplied by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoProps {
    /// Source frame rate.
    pub fps: f64,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Total frame count, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
}

impl VideoProps {
    pub fn new(fps: f64, width: u32, height: u32) -> Self {
        Self {
            fps,
            width,
            height,
            frame_count: None,
        }
    }

    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.frame_count = Some(frame_count);
        self
    }

    /// Video duration in seconds, or 0 when the frame count or fps is unknown.
    pub fn duration(&self) -> f64 {
        match self.frame_count {
            Some(frames) if self.fps > 0.0 => frames as f64 / self.fps,
            _ => 0.0,
        }
    }
}

/// Original and processing resolutions, formatted as `WxH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub original: String,
    pub processed: String,
}

impl Resolution {
    pub fn new(original: (u32, u32), processed: (u32, u32)) -> Self {
        Self {
            original: format!("{}x{}", original.0, original.1),
            processed: format!("{}x{}", processed.0, processed.1),
        }
    }
}

/// The engine's externally visible output for one video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipReport {
    /// Unique id of this processing run.
    pub run_id: Uuid,
    /// Video file name.
    pub video: String,
    /// Full path of the source video.
    pub video_path: String,
    pub fps: f64,
    /// Duration in seconds.
    pub duration: f64,
    pub resolution: Resolution,
    pub zones_file: String,
    pub processed_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
    pub clips: Vec<ClipRecord>,
}

fn round_centis(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ClipReport {
    /// Assemble a report, rounding header numbers to two decimals.
    pub fn new(
        video_path: &str,
        zones_file: &str,
        video: &VideoProps,
        resolution: Resolution,
        processing_time_seconds: f64,
        clips: Vec<ClipRecord>,
    ) -> Self {
        let video_name = std::path::Path::new(video_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| video_path.to_string());

        Self {
            run_id: Uuid::new_v4(),
            video: video_name,
            video_path: video_path.to_string(),
            fps: round_centis(video.fps),
            duration: round_centis(video.duration()),
            resolution,
            zones_file: zones_file.to_string(),
            processed_at: Utc::now(),
            processing_time_seconds: round_centis(processing_time_seconds),
            clips,
        }
    }

    /// Count clips per tag and total clip time.
    pub fn summary(&self) -> ClipSummary {
        let mut summary = ClipSummary::default();
        for clip in &self.clips {
            match clip.tag {
                ClipTag::Rally => summary.rally += 1,
                ClipTag::Serve => summary.serve += 1,
                ClipTag::Noise => summary.noise += 1,
            }
            summary.total_seconds += clip.duration;
        }
        summary
    }
}

/// Per-tag clip counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSummary {
    pub rally: usize,
    pub serve: usize,
    pub noise: usize,
    pub total_seconds: f64,
}

impl ClipSummary {
    pub fn total(&self) -> usize {
        self.rally + self.serve + self.noise
    }
}

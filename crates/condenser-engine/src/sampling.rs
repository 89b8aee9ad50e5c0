//! Frame sampling plan.
//!
//! Maps a video's source frame rate onto the processing cadence: which decoded
//! frames reach the engine, how many source frames each one stands for, and
//! the inference resolution.

use condenser_models::{Resolution, VideoProps};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Sampling and scaling decisions for one video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    /// Source frame rate.
    pub fps: f64,
    /// Source frames advanced per processed frame (always >= 1).
    pub logic_step: u32,
    /// Logic ticks per second as configured (`process_fps / (skip + 1)`).
    pub effective_logic_fps: f64,
    /// `process_width / original_width`.
    pub scale_factor: f64,
    pub original_width: u32,
    pub original_height: u32,
    pub processed_width: u32,
    pub processed_height: u32,
}

impl FramePlan {
    pub fn new(video: &VideoProps, config: &EngineConfig) -> EngineResult<Self> {
        if !(video.fps > 0.0) || !video.fps.is_finite() {
            return Err(EngineError::invalid_video(format!(
                "fps must be > 0, got {}",
                video.fps
            )));
        }
        if video.width == 0 || video.height == 0 {
            return Err(EngineError::invalid_video(format!(
                "resolution must be non-zero, got {}x{}",
                video.width, video.height
            )));
        }
        if !(config.process_fps > 0.0) {
            return Err(EngineError::invalid_config("process_fps", "must be > 0"));
        }

        let ticks = (config.skip_frames + 1) as f64;
        // Ties round to even (25 fps at skip 2 steps by 2).
        let logic_step = ((video.fps * ticks / config.process_fps).round_ties_even() as u32).max(1);
        let scale_factor = config.process_width as f64 / video.width as f64;

        Ok(Self {
            fps: video.fps,
            logic_step,
            effective_logic_fps: config.process_fps / ticks,
            scale_factor,
            original_width: video.width,
            original_height: video.height,
            processed_width: config.process_width,
            processed_height: (video.height as f64 * scale_factor).floor() as u32,
        })
    }

    /// Whether the 1-based source frame `frame` is on the processing grid.
    pub fn should_process(&self, frame: u64) -> bool {
        frame > 0 && frame % self.logic_step as u64 == 0
    }

    /// Video timestamp of a 1-based source frame.
    pub fn timestamp(&self, frame: u64) -> f64 {
        frame as f64 / self.fps
    }

    /// 0-based position of an on-grid frame in the processing sequence.
    pub fn sequence(&self, frame: u64) -> Option<u64> {
        if self.should_process(frame) {
            Some(frame / self.logic_step as u64 - 1)
        } else {
            None
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(
            (self.original_width, self.original_height),
            (self.processed_width, self.processed_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(fps: f64, skip: u32) -> FramePlan {
        let config = EngineConfig::default().with_skip_frames(skip);
        FramePlan::new(&VideoProps::new(fps, 1920, 1080), &config).unwrap()
    }

    #[test]
    fn test_logic_step_default_skip() {
        assert_eq!(plan(30.0, 2).logic_step, 3);
        assert_eq!(plan(60.0, 2).logic_step, 6);
        assert_eq!(plan(30.0, 0).logic_step, 1);
    }

    #[test]
    fn test_logic_step_never_zero() {
        let config = EngineConfig {
            process_fps: 120.0,
            ..EngineConfig::default().with_skip_frames(0)
        };
        let p = FramePlan::new(&VideoProps::new(24.0, 1280, 720), &config).unwrap();
        assert_eq!(p.logic_step, 1);
    }

    #[test]
    fn test_logic_step_rounds() {
        // 25 * 3 / 30 = 2.5 -> ties to even
        assert_eq!(plan(25.0, 2).logic_step, 2);
        // 35 * 3 / 30 = 3.5 -> 4
        assert_eq!(plan(35.0, 2).logic_step, 4);
        // 29.97 * 3 / 30 = 2.997
        assert_eq!(plan(29.97, 2).logic_step, 3);
    }

    #[test]
    fn test_scaling_and_resolution() {
        let p = plan(30.0, 2);
        assert!((p.scale_factor - 640.0 / 1920.0).abs() < 1e-12);
        assert_eq!(p.processed_height, 360);
        assert!((p.effective_logic_fps - 10.0).abs() < 1e-12);
        assert_eq!(p.resolution().original, "1920x1080");
        assert_eq!(p.resolution().processed, "640x360");
    }

    #[test]
    fn test_grid_is_one_based() {
        let p = plan(30.0, 2);
        assert!(!p.should_process(0));
        assert!(!p.should_process(1));
        assert!(p.should_process(3));
        assert_eq!(p.sequence(3), Some(0));
        assert_eq!(p.sequence(9), Some(2));
        assert_eq!(p.sequence(10), None);
        assert!((p.timestamp(45) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_video() {
        let config = EngineConfig::default();
        assert!(FramePlan::new(&VideoProps::new(0.0, 1920, 1080), &config).is_err());
        assert!(FramePlan::new(&VideoProps::new(30.0, 0, 1080), &config).is_err());
    }
}

//! Structured session logging.
//!
//! Every detection session logs under the same `run_id` that ends up in its
//! clip report, so log lines and artifacts can be joined.

use condenser_models::ClipInfo;
use tracing::{info, warn, Span};

/// Logger carrying the run id and video name of one session.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    run_id: String,
    video: String,
}

impl SessionLogger {
    pub fn new(run_id: impl Into<String>, video: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            video: video.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            video = %self.video,
            "Session started: {}", message
        );
    }

    pub fn log_clip(&self, index: usize, clip: &ClipInfo) {
        info!(
            run_id = %self.run_id,
            video = %self.video,
            clip = index,
            start = clip.start,
            end = clip.end,
            tag = clip.tag.as_str(),
            peak_energy = clip.peak_energy,
            "Clip recorded"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            video = %self.video,
            "Session warning: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            video = %self.video,
            "Session completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    /// Span to enter around per-frame processing.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            run_id = %self.run_id,
            video = %self.video
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_logger_fields() {
        let logger = SessionLogger::new("run-1", "match.mp4");
        assert_eq!(logger.run_id(), "run-1");
        assert_eq!(logger.video(), "match.mp4");
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger = SessionLogger::new("run-2", "match.mp4");
        let _guard = logger.create_span().entered();
        logger.log_start("zones=4");
        logger.log_warning("no skeletons");
        logger.log_completion("3 clips");
    }
}

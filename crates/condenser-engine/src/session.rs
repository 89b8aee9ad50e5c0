//! Per-video detection session.
//!
//! A session owns one zone tester, one energy estimator and one state machine
//! and drives them in lock-step, one processed frame at a time. Point
//! coordinates in observations are in processing-resolution pixels, the same
//! space the zones are scaled into.

use std::time::Instant;

use condenser_models::{
    ClipInfo, ClipRecord, ClipReport, FrameInput, FrameObservation, VideoProps,
};
use metrics::counter;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::energy::EnergyEstimator;
use crate::error::EngineResult;
use crate::keypoints::KeypointExtractor;
use crate::logging::SessionLogger;
use crate::sampling::FramePlan;
use crate::state_machine::{EventStateMachine, FrameSignals};
use crate::zones::{ZoneStatus, ZoneTester};

/// Everything observed and decided for one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub frame: u64,
    pub timestamp: f64,
    pub zones: ZoneStatus,
    pub raw_energy: f64,
    pub smooth_energy: f64,
    pub skeleton_count: usize,
    /// State after this frame.
    pub state: &'static str,
    pub threshold: f64,
    /// Clip closed by this frame, if any.
    pub clip: Option<ClipInfo>,
}

/// Where the inputs of a session came from, for the report header.
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub video_path: String,
    pub zones_file: String,
}

impl ReportMeta {
    pub fn new(video_path: impl Into<String>, zones_file: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            zones_file: zones_file.into(),
        }
    }
}

/// Detection state for one video.
#[derive(Debug)]
pub struct DetectionSession {
    run_id: Uuid,
    video: VideoProps,
    plan: FramePlan,
    zones: ZoneTester,
    energy: EnergyEstimator,
    machine: EventStateMachine,
    extractor: KeypointExtractor,
    logger: SessionLogger,
    frames_processed: u64,
    started: Instant,
}

impl DetectionSession {
    /// Validate the configuration, scale the zones to the processing width and
    /// derive frame thresholds from the source fps.
    pub fn new(config: EngineConfig, zones: ZoneTester, video: VideoProps) -> EngineResult<Self> {
        Self::with_name(config, zones, video, "video")
    }

    /// Like `new`, naming the video in logs.
    pub fn with_name(
        config: EngineConfig,
        mut zones: ZoneTester,
        video: VideoProps,
        name: &str,
    ) -> EngineResult<Self> {
        config.validate()?;
        let plan = FramePlan::new(&video, &config)?;
        zones.scale(video.width, config.process_width)?;

        let mut energy =
            EnergyEstimator::new(config.max_skeleton_match_distance, config.energy_smoothing_factor);
        energy.set_scale_factor(zones.scale_factor());

        let run_id = Uuid::new_v4();
        let logger = SessionLogger::new(run_id.to_string(), name);
        if zones.len() < config.min_occupied_zones {
            logger.log_warning(&format!(
                "{} zones defined but {} must be occupied; no serve can be detected",
                zones.len(),
                config.min_occupied_zones
            ));
        }
        logger.log_start(&format!(
            "zones={} fps={} logic_step={} scale={:.3}",
            zones.len(),
            video.fps,
            plan.logic_step,
            plan.scale_factor
        ));

        Ok(Self {
            run_id,
            machine: EventStateMachine::new(config.clone(), video.fps)?,
            extractor: KeypointExtractor::from_config(&config),
            video,
            plan,
            zones,
            energy,
            logger,
            frames_processed: 0,
            started: Instant::now(),
        })
    }

    /// Run one processed frame through zones, energy and the state machine.
    ///
    /// Frames must arrive in processing order. The timestamp defaults to
    /// `frame / fps` when the observation carries none.
    pub fn process(&mut self, frame: &FrameObservation) -> EngineResult<FrameOutcome> {
        let timestamp = frame
            .timestamp
            .unwrap_or_else(|| self.plan.timestamp(frame.frame));

        let zones = self.zones.check(&frame.ankles);
        let raw_energy = self.energy.calculate(&frame.hips);
        let smooth_energy = self.energy.update_smooth(raw_energy);
        let skeleton_count = frame.skeleton_count();

        let before = self.machine.state_name();
        let clip = self.machine.update(FrameSignals::new(
            timestamp,
            zones.active_count,
            smooth_energy,
            skeleton_count,
            self.plan.logic_step,
        ))?;
        let state = self.machine.state_name();

        if state != before {
            debug!(
                frame = frame.frame,
                timestamp,
                from = before,
                to = state,
                energy = smooth_energy,
                "State transition"
            );
        }
        if let Some(clip) = &clip {
            self.logger.log_clip(self.machine.clips().len(), clip);
        }

        self.frames_processed += 1;
        counter!("condenser_frames_processed_total").increment(1);

        Ok(FrameOutcome {
            frame: frame.frame,
            timestamp,
            zones,
            raw_energy,
            smooth_energy,
            skeleton_count,
            state,
            threshold: self.machine.threshold(),
            clip,
        })
    }

    /// Process either input form, extracting keypoints from raw poses.
    pub fn process_input(&mut self, input: &FrameInput) -> EngineResult<FrameOutcome> {
        match input {
            FrameInput::Observation(obs) => self.process(obs),
            FrameInput::Poses(poses) => {
                let obs = self.extractor.extract(poses);
                self.process(&obs)
            }
        }
    }

    /// Build the clip report for everything processed so far.
    ///
    /// A point still open when the video ends is not reported.
    pub fn finish(&self, meta: &ReportMeta) -> ClipReport {
        let clips: Vec<ClipRecord> = self.machine.clips().iter().map(ClipRecord::from).collect();
        let mut report = ClipReport::new(
            &meta.video_path,
            &meta.zones_file,
            &self.video,
            self.plan.resolution(),
            self.started.elapsed().as_secs_f64(),
            clips,
        );
        report.run_id = self.run_id;

        let summary = report.summary();
        self.logger.log_completion(&format!(
            "frames={} clips={} rally={} serve={} noise={} open_state={}",
            self.frames_processed,
            summary.total(),
            summary.rally,
            summary.serve,
            summary.noise,
            self.machine.state_name()
        ));
        report
    }

    /// Forget all per-video state, ready for another pass.
    pub fn reset(&mut self) {
        self.energy.reset();
        self.machine.reset();
        self.frames_processed = 0;
        self.started = Instant::now();
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn logger(&self) -> &SessionLogger {
        &self.logger
    }

    pub fn state_machine(&self) -> &EventStateMachine {
        &self.machine
    }

    pub fn clips(&self) -> &[ClipInfo] {
        self.machine.clips()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

//! Four-state rally detector.
//!
//! ```text
//!                 zones held for min_hold          zones released (serve)
//!  ┌───────────┐ ─────────────────────► ┌────────┐ ────────────────────► ┌───────────┐
//!  │ SEARCHING │                        │ LOCKED │                       │ PROBATION │
//!  └───────────┘ ◄──────────┐           └────────┘ ◄────────┐            └───────────┘
//!        ▲                  │ low energy                    │ zones held 1s     │
//!        │                  │ after min_point               │ (force cut)       │ energy > threshold
//!        │                  └───────────────────────────────┼───────────────────┤ after min_point
//!        │   sustained low energy                     ┌─────┴─┐                 │
//!        └────────────────────────────────────────────│ RALLY │◄────────────────┘
//!                                                     └───────┘
//! ```
//!
//! Every counter is accumulated in source frames (`logic_step` per tick) so
//! thresholds stay time-accurate whatever the frame-skip setting. Time comes
//! only from the timestamps fed in, which must strictly increase.

use condenser_models::ClipInfo;
use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::calibration::calibrate;
use crate::classifier::ClipClassifier;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Seconds players must stand in position mid-rally before a force cut.
pub const FORCE_CUT_HOLD_SECS: f64 = 1.0;

/// A force-cut clip ends this many seconds before the cut is detected.
pub const FORCE_CUT_REWIND_SECS: f64 = 1.0;

/// Threshold reported before the first calibration of a session.
pub const INITIAL_DYNAMIC_THRESHOLD: f64 = 40.0;

/// Externally visible detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    /// Waiting for players to take their serve positions.
    Searching,
    /// Players in position; measuring baseline energy.
    Locked,
    /// Serve detected; the point must survive the minimum duration.
    Probation,
    /// Active rally; watching for the point to end.
    Rally,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Searching => "SEARCHING",
            GameState::Locked => "LOCKED",
            GameState::Probation => "PROBATION",
            GameState::Rally => "RALLY",
        }
    }
}

/// Signals for one logic tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSignals {
    /// Video timestamp in seconds.
    pub timestamp: f64,
    /// Number of occupied zones.
    pub active_zones: usize,
    /// Smoothed movement energy.
    pub smooth_energy: f64,
    /// Skeletons detected this frame.
    pub skeleton_count: usize,
    /// Source frames represented by this tick.
    pub logic_step: u32,
}

impl FrameSignals {
    pub fn new(
        timestamp: f64,
        active_zones: usize,
        smooth_energy: f64,
        skeleton_count: usize,
        logic_step: u32,
    ) -> Self {
        Self {
            timestamp,
            active_zones,
            smooth_energy,
            skeleton_count,
            logic_step,
        }
    }
}

/// Frame-count thresholds derived from the source frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameThresholds {
    /// Frames of held position before LOCKED.
    pub start: u32,
    /// Frames of held position that force-cut a rally.
    pub force_cut: u32,
    /// Frames of low energy that end a point.
    pub end: u32,
}

impl FrameThresholds {
    pub fn new(config: &EngineConfig, fps: f64) -> Self {
        Self {
            start: (config.min_hold_duration * fps) as u32,
            force_cut: (FORCE_CUT_HOLD_SECS * fps) as u32,
            end: (config.min_low_energy_duration * fps) as u32,
        }
    }
}

/// Running measurements of the point currently being recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    serve_time: f64,
    low_energy_frames: u32,
    peak_energy: f64,
}

impl Candidate {
    fn new(serve_time: f64) -> Self {
        Self {
            serve_time,
            low_energy_frames: 0,
            peak_energy: 0.0,
        }
    }
}

/// Per-state private data.
#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Searching { frames_held: u32, baseline: Vec<f64> },
    Locked { frames_held: u32, baseline: Vec<f64> },
    Probation(Candidate),
    Rally { candidate: Candidate, frames_held: u32 },
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Searching {
            frames_held: 0,
            baseline: Vec::new(),
        }
    }
}

/// Turns per-frame signals into closed, classified clips.
///
/// One instance per video; never shared between threads.
#[derive(Debug, Clone)]
pub struct EventStateMachine {
    config: EngineConfig,
    thresholds: FrameThresholds,
    classifier: ClipClassifier,
    phase: Phase,
    dynamic_threshold: f64,
    last_timestamp: Option<f64>,
    clips: Vec<ClipInfo>,
}

impl EventStateMachine {
    /// Create a state machine for a video with the given source frame rate.
    pub fn new(config: EngineConfig, fps: f64) -> EngineResult<Self> {
        config.validate()?;
        if !(fps > 0.0) || !fps.is_finite() {
            return Err(EngineError::invalid_video(format!("fps must be > 0, got {}", fps)));
        }

        let thresholds = FrameThresholds::new(&config, fps);
        debug!(
            fps,
            start_frames = thresholds.start,
            force_cut_frames = thresholds.force_cut,
            end_frames = thresholds.end,
            "State machine frame thresholds"
        );

        Ok(Self {
            classifier: ClipClassifier::from_config(&config),
            config,
            thresholds,
            phase: Phase::default(),
            dynamic_threshold: INITIAL_DYNAMIC_THRESHOLD,
            last_timestamp: None,
            clips: Vec::new(),
        })
    }

    /// Advance one logic tick. Returns the clip closed by this tick, if any.
    pub fn update(&mut self, signals: FrameSignals) -> EngineResult<Option<ClipInfo>> {
        let FrameSignals {
            timestamp: ts,
            active_zones,
            smooth_energy: energy,
            skeleton_count,
            logic_step: step,
        } = signals;

        if step < 1 {
            return Err(EngineError::InvalidLogicStep(step));
        }
        if !ts.is_finite() {
            return Err(EngineError::InvalidTimestamp(ts));
        }
        if let Some(previous) = self.last_timestamp {
            if ts <= previous {
                return Err(EngineError::NonMonotonicTimestamp {
                    previous,
                    current: ts,
                });
            }
        }
        self.last_timestamp = Some(ts);

        let zones_held = active_zones >= self.config.min_occupied_zones;
        let mut completed = None;

        // Peak tracking covers every tick spent in PROBATION or RALLY.
        match &mut self.phase {
            Phase::Probation(c) | Phase::Rally { candidate: c, .. } => {
                c.peak_energy = c.peak_energy.max(energy);
            }
            _ => {}
        }

        // Global override: players back in serve position mid-rally.
        let mut force_cut = None;
        if let Phase::Rally {
            candidate,
            frames_held,
        } = &mut self.phase
        {
            if zones_held {
                *frames_held += step;
                if *frames_held >= self.thresholds.force_cut {
                    force_cut = Some(*candidate);
                }
            } else {
                *frames_held = 0;
            }
        }
        if let Some(candidate) = force_cut {
            info!(timestamp = ts, "Force cut: players reset to serve positions");
            counter!("condenser_force_cuts_total").increment(1);
            completed = Some(self.materialize(&candidate, ts - FORCE_CUT_REWIND_SECS));
            self.phase = Phase::Locked {
                frames_held: self.thresholds.start,
                baseline: Vec::new(),
            };
        }

        let phase = std::mem::take(&mut self.phase);
        self.phase = match phase {
            Phase::Searching {
                mut frames_held,
                mut baseline,
            } => {
                if zones_held {
                    frames_held += step;
                    baseline.push(energy);
                    if frames_held >= self.thresholds.start {
                        debug!(timestamp = ts, frames_held, "Players locked in position");
                        Phase::Locked {
                            frames_held,
                            baseline,
                        }
                    } else {
                        Phase::Searching {
                            frames_held,
                            baseline,
                        }
                    }
                } else {
                    Phase::default()
                }
            }

            Phase::Locked {
                frames_held,
                mut baseline,
            } => {
                baseline.push(energy);
                if zones_held {
                    Phase::Locked {
                        frames_held,
                        baseline,
                    }
                } else {
                    self.dynamic_threshold = calibrate(
                        &baseline,
                        self.config.base_sensitivity,
                        self.config.min_dynamic_threshold,
                        self.config.max_dynamic_threshold,
                    );
                    info!(
                        timestamp = ts,
                        threshold = self.dynamic_threshold,
                        baseline_readings = baseline.len(),
                        "Serve detected"
                    );
                    Phase::Probation(Candidate::new(ts))
                }
            }

            Phase::Probation(mut candidate) => {
                let threshold = self.dynamic_threshold;
                if energy < threshold {
                    candidate.low_energy_frames += step;
                } else {
                    candidate.low_energy_frames = 0;
                }

                let elapsed = ts - candidate.serve_time;
                if elapsed >= self.config.min_point_duration && energy > threshold {
                    debug!(timestamp = ts, energy, threshold, "Point promoted to rally");
                    candidate.low_energy_frames = 0;
                    Phase::Rally {
                        candidate,
                        frames_held: 0,
                    }
                } else if elapsed >= self.config.min_point_duration
                    && candidate.low_energy_frames >= self.thresholds.end
                {
                    info!(timestamp = ts, "Short clip closed on sustained low energy");
                    completed =
                        Some(self.materialize(&candidate, ts + self.config.post_point_buffer));
                    Phase::default()
                } else {
                    Phase::Probation(candidate)
                }
            }

            Phase::Rally {
                mut candidate,
                frames_held,
            } => {
                // Occlusion shield: nobody visible never counts toward ending the point.
                if skeleton_count < 1 || energy >= self.dynamic_threshold {
                    candidate.low_energy_frames = 0;
                } else {
                    candidate.low_energy_frames += step;
                }

                if candidate.low_energy_frames >= self.thresholds.end {
                    info!(timestamp = ts, "Rally ended");
                    completed =
                        Some(self.materialize(&candidate, ts + self.config.post_point_buffer));
                    Phase::default()
                } else {
                    Phase::Rally {
                        candidate,
                        frames_held,
                    }
                }
            }
        };

        if let Some(clip) = &completed {
            counter!("condenser_clips_total", "tag" => clip.tag.as_str()).increment(1);
            histogram!("condenser_clip_peak_energy").record(clip.peak_energy as f64);
            self.clips.push(clip.clone());
        }
        Ok(completed)
    }

    /// Build the clip descriptor for the current candidate.
    fn materialize(&self, candidate: &Candidate, end: f64) -> ClipInfo {
        let start = (candidate.serve_time - self.config.pre_serve_buffer).max(0.0);
        let (tag, confidence) = self
            .classifier
            .classify(end - start, candidate.peak_energy);

        info!(
            start,
            end,
            tag = tag.as_str(),
            peak_energy = candidate.peak_energy,
            "Clip closed"
        );

        ClipInfo {
            start,
            end,
            tag,
            confidence,
            peak_energy: candidate.peak_energy as i64,
        }
    }

    /// Return to SEARCHING with no clips (new video).
    pub fn reset(&mut self) {
        self.phase = Phase::default();
        self.dynamic_threshold = INITIAL_DYNAMIC_THRESHOLD;
        self.last_timestamp = None;
        self.clips.clear();
    }

    pub fn state(&self) -> GameState {
        match self.phase {
            Phase::Searching { .. } => GameState::Searching,
            Phase::Locked { .. } => GameState::Locked,
            Phase::Probation(_) => GameState::Probation,
            Phase::Rally { .. } => GameState::Rally,
        }
    }

    /// State name for overlays and logs.
    pub fn state_name(&self) -> &'static str {
        self.state().as_str()
    }

    /// Most recently calibrated threshold.
    pub fn threshold(&self) -> f64 {
        self.dynamic_threshold
    }

    /// All clips closed so far, in order.
    pub fn clips(&self) -> &[ClipInfo] {
        &self.clips
    }

    pub fn into_clips(self) -> Vec<ClipInfo> {
        self.clips
    }

    pub fn thresholds(&self) -> FrameThresholds {
        self.thresholds
    }

    /// Held-position frame counter of the current state (0 in PROBATION).
    pub fn held_frames(&self) -> u32 {
        match &self.phase {
            Phase::Searching { frames_held, .. }
            | Phase::Locked { frames_held, .. }
            | Phase::Rally { frames_held, .. } => *frames_held,
            Phase::Probation(_) => 0,
        }
    }

    /// Low-energy frame counter of the current point (0 outside a point).
    pub fn low_energy_frames(&self) -> u32 {
        match &self.phase {
            Phase::Probation(c) | Phase::Rally { candidate: c, .. } => c.low_energy_frames,
            _ => 0,
        }
    }

    /// Baseline readings collected so far (0 outside SEARCHING/LOCKED).
    pub fn baseline_len(&self) -> usize {
        match &self.phase {
            Phase::Searching { baseline, .. } | Phase::Locked { baseline, .. } => baseline.len(),
            _ => 0,
        }
    }

    /// Peak energy of the current point, if one is being recorded.
    pub fn peak_energy(&self) -> Option<f64> {
        match &self.phase {
            Phase::Probation(c) | Phase::Rally { candidate: c, .. } => Some(c.peak_energy),
            _ => None,
        }
    }

    /// Serve timestamp of the current point, if one is being recorded.
    pub fn serve_time(&self) -> Option<f64> {
        match &self.phase {
            Phase::Probation(c) | Phase::Rally { candidate: c, .. } => Some(c.serve_time),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condenser_models::ClipTag;

    const FPS: f64 = 30.0;

    /// Feeds ticks at 30 fps, one source frame per tick.
    struct Driver {
        sm: EventStateMachine,
        frame: u64,
    }

    impl Driver {
        fn new() -> Self {
            Self::with_config(EngineConfig::default())
        }

        fn with_config(config: EngineConfig) -> Self {
            Self {
                sm: EventStateMachine::new(config, FPS).unwrap(),
                frame: 0,
            }
        }

        fn tick(&mut self, zones: usize, energy: f64, skeletons: usize) -> Option<ClipInfo> {
            self.frame += 1;
            let ts = self.frame as f64 / FPS;
            self.sm
                .update(FrameSignals::new(ts, zones, energy, skeletons, 1))
                .unwrap()
        }

        fn run(&mut self, n: usize, zones: usize, energy: f64, skeletons: usize) -> Vec<ClipInfo> {
            (0..n).filter_map(|_| self.tick(zones, energy, skeletons)).collect()
        }
    }

    #[test]
    fn test_thresholds_from_fps() {
        let t = FrameThresholds::new(&EngineConfig::default(), FPS);
        assert_eq!(t.start, 75);
        assert_eq!(t.force_cut, 30);
        assert_eq!(t.end, 75);
    }

    #[test]
    fn test_hold_below_threshold_stays_searching() {
        let mut d = Driver::new();
        d.run(74, 2, 20.0, 2);
        assert_eq!(d.sm.state(), GameState::Searching);
        assert_eq!(d.sm.held_frames(), 74);
        assert_eq!(d.sm.baseline_len(), 74);

        d.run(1, 2, 20.0, 2);
        assert_eq!(d.sm.state(), GameState::Locked);
    }

    #[test]
    fn test_hold_respects_logic_step() {
        let mut sm = EventStateMachine::new(EngineConfig::default(), FPS).unwrap();
        // 75 source frames at a step of 3 = 25 ticks
        for i in 1..=24u32 {
            let ts = (i * 3) as f64 / FPS;
            sm.update(FrameSignals::new(ts, 2, 10.0, 2, 3)).unwrap();
        }
        assert_eq!(sm.state(), GameState::Searching);
        sm.update(FrameSignals::new(75.0 / FPS, 2, 10.0, 2, 3)).unwrap();
        assert_eq!(sm.state(), GameState::Locked);
    }

    #[test]
    fn test_zone_drop_resets_search() {
        let mut d = Driver::new();
        d.run(50, 2, 20.0, 2);
        d.run(1, 1, 20.0, 2);
        assert_eq!(d.sm.state(), GameState::Searching);
        assert_eq!(d.sm.held_frames(), 0);
        assert_eq!(d.sm.baseline_len(), 0);
    }

    #[test]
    fn test_release_calibrates_and_enters_probation() {
        let mut config = EngineConfig::default();
        config.min_dynamic_threshold = 20.0;
        config.max_dynamic_threshold = 100.0;
        let mut d = Driver::with_config(config);

        d.run(90, 2, 20.0, 2);
        assert_eq!(d.sm.state(), GameState::Locked);
        d.run(1, 0, 20.0, 2);

        assert_eq!(d.sm.state(), GameState::Probation);
        assert!((d.sm.threshold() - 35.0).abs() < 1e-9);
        assert_eq!(d.sm.serve_time(), Some(91.0 / FPS));
        assert_eq!(d.sm.peak_energy(), Some(0.0));
    }

    #[test]
    fn test_probation_needs_min_duration_before_promotion() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(60, 0, 150.0, 2);
        assert_eq!(d.sm.state(), GameState::Probation);
        d.run(20, 0, 150.0, 2);
        assert_eq!(d.sm.state(), GameState::Rally);
        assert_eq!(d.sm.peak_energy(), Some(150.0));
    }

    #[test]
    fn test_occlusion_shield_blocks_low_energy_count() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(80, 0, 150.0, 2);
        assert_eq!(d.sm.state(), GameState::Rally);

        d.run(10, 0, 5.0, 2);
        assert_eq!(d.sm.low_energy_frames(), 10);

        d.run(1, 0, 5.0, 0);
        assert_eq!(d.sm.low_energy_frames(), 0);

        // Long occlusion never ends the rally.
        let clips = d.run(300, 0, 0.0, 0);
        assert!(clips.is_empty());
        assert_eq!(d.sm.state(), GameState::Rally);
    }

    #[test]
    fn test_rally_ends_after_sustained_low_energy() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(80, 0, 150.0, 2);

        let clips = d.run(74, 0, 10.0, 2);
        assert!(clips.is_empty());
        let clip = d.tick(0, 10.0, 2).expect("rally closes on the 75th low frame");

        assert_eq!(clip.tag, ClipTag::Rally);
        assert_eq!(clip.peak_energy, 150);
        let end_ts = d.frame as f64 / FPS;
        assert!((clip.end - (end_ts - 1.0)).abs() < 1e-9);
        // Serve at ~3.03s minus the 4s pre-buffer clamps to zero.
        assert_eq!(clip.start, 0.0);
        assert_eq!(d.sm.state(), GameState::Searching);
        assert_eq!(d.sm.clips().len(), 1);
    }

    #[test]
    fn test_force_cut_jumps_to_locked() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(80, 0, 150.0, 2);

        assert!(d.run(29, 2, 150.0, 2).is_empty());
        assert_eq!(d.sm.held_frames(), 29);
        let clip = d.tick(2, 150.0, 2).expect("force cut after one second");

        let ts = d.frame as f64 / FPS;
        assert!((clip.end - (ts - FORCE_CUT_REWIND_SECS)).abs() < 1e-9);
        assert_eq!(d.sm.state(), GameState::Locked);
        assert_eq!(d.sm.held_frames(), d.sm.thresholds().start);
        assert_eq!(d.sm.baseline_len(), 1);
    }

    #[test]
    fn test_override_counter_resets_when_zones_drop() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(80, 0, 150.0, 2);
        d.run(20, 2, 150.0, 2);
        d.run(1, 1, 150.0, 2);
        assert_eq!(d.sm.held_frames(), 0);
        assert!(d.run(20, 2, 150.0, 2).is_empty());
        assert_eq!(d.sm.state(), GameState::Rally);
    }

    #[test]
    fn test_rejects_non_monotonic_timestamp() {
        let mut sm = EventStateMachine::new(EngineConfig::default(), FPS).unwrap();
        sm.update(FrameSignals::new(1.0, 0, 0.0, 0, 1)).unwrap();
        let err = sm.update(FrameSignals::new(1.0, 0, 0.0, 0, 1)).unwrap_err();
        assert!(matches!(err, EngineError::NonMonotonicTimestamp { .. }));
        assert!(sm.update(FrameSignals::new(0.5, 0, 0.0, 0, 1)).is_err());
        assert!(sm.update(FrameSignals::new(1.1, 0, 0.0, 0, 1)).is_ok());
    }

    #[test]
    fn test_rejects_non_finite_timestamp() {
        let mut sm = EventStateMachine::new(EngineConfig::default(), FPS).unwrap();
        sm.update(FrameSignals::new(1.0, 0, 0.0, 0, 1)).unwrap();
        assert!(matches!(
            sm.update(FrameSignals::new(f64::INFINITY, 0, 0.0, 0, 1)),
            Err(EngineError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            sm.update(FrameSignals::new(f64::NAN, 0, 0.0, 0, 1)),
            Err(EngineError::InvalidTimestamp(_))
        ));
        // Rejected ticks leave the clock where it was.
        assert!(sm.update(FrameSignals::new(1.1, 0, 0.0, 0, 1)).is_ok());
    }

    #[test]
    fn test_rejects_zero_logic_step() {
        let mut sm = EventStateMachine::new(EngineConfig::default(), FPS).unwrap();
        assert!(matches!(
            sm.update(FrameSignals::new(1.0, 0, 0.0, 0, 0)),
            Err(EngineError::InvalidLogicStep(0))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.energy_smoothing_factor = 2.0;
        assert!(EventStateMachine::new(config, FPS).is_err());
        assert!(EventStateMachine::new(EngineConfig::default(), 0.0).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut d = Driver::new();
        d.run(90, 2, 20.0, 2);
        d.run(1, 0, 150.0, 2);
        d.run(80, 0, 150.0, 2);
        d.run(80, 0, 10.0, 2);
        assert_eq!(d.sm.clips().len(), 1);

        d.sm.reset();
        assert_eq!(d.sm.state(), GameState::Searching);
        assert!(d.sm.clips().is_empty());
        assert_eq!(d.sm.threshold(), INITIAL_DYNAMIC_THRESHOLD);
        // Timestamps may restart after a reset.
        assert!(d.sm.update(FrameSignals::new(0.1, 0, 0.0, 0, 1)).is_ok());
    }
}

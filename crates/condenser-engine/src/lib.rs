//! Rally and serve detection for roundnet video.
//!
//! The engine consumes per-frame pose signals (ankle positions and hip
//! centres) and emits time-stamped, classified clips:
//!
//! - [`zones`]: which serve zones are occupied
//! - [`energy`]: how much the players are moving
//! - [`calibration`]: the per-point energy threshold
//! - [`state_machine`]: SEARCHING / LOCKED / PROBATION / RALLY
//! - [`classifier`]: Rally / Serve / Noise tagging
//!
//! [`DetectionSession`] wires them together for one video.

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod energy;
pub mod error;
pub mod keypoints;
pub mod logging;
pub mod ordering;
pub mod sampling;
pub mod session;
pub mod state_machine;
pub mod zones;

pub use calibration::{calibrate, FALLBACK_NOISE_FLOOR};
pub use classifier::ClipClassifier;
pub use config::EngineConfig;
pub use energy::EnergyEstimator;
pub use error::{EngineError, EngineResult};
pub use keypoints::{KeypointExtractor, KeypointIndex};
pub use logging::SessionLogger;
pub use ordering::OrderedFrames;
pub use sampling::FramePlan;
pub use session::{DetectionSession, FrameOutcome, ReportMeta};
pub use state_machine::{
    EventStateMachine, FrameSignals, FrameThresholds, GameState, FORCE_CUT_HOLD_SECS,
    FORCE_CUT_REWIND_SECS, INITIAL_DYNAMIC_THRESHOLD,
};
pub use zones::{Zone, ZoneStatus, ZoneTester};

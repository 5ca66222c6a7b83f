//! BEAMCHECK - headlight beam aiming core
//!
//! Measures a headlight beam from camera frames and reports it to a test
//! bench controller. Each frame goes through:
//!
//! 1. crop and recenter on the calibrated center
//! 2. autoexposure (peak held at a setpoint)
//! 3. detection of the beam reference point (two-line cutoff, one-line
//!    cutoff or hotspot centroid, by beam type)
//! 4. pixel luminosity next to the point, calibrated to lux
//! 5. scoring against the tolerance window
//!
//! The controller link exchanges one text message per cycle: measurements
//! out, `keyword value;` commands in. A multi-step calibration workflow
//! derives the crop center, the tilt slope and the lux lines.

pub mod autoexposure;
pub mod calibration;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod detection;
pub mod error;
pub mod live;
pub mod luminosity;
pub mod protocol;
pub mod station;
pub mod store;

// Re-export commonly used types for external use
pub use crate::autoexposure::{AutoExposure, ExposureMode, ExposureState, ExposureStep, RunTransition};
pub use crate::calibration::{CalibrationSession, CalibrationStep};
pub use crate::classifier::{classify, ClassificationResult, Magnitude, Status, ToleranceWindow};
pub use crate::commands::{BeamSelector, CommandTable, PositionMode, ViewFlags};
pub use crate::config::StationConfig;
pub use crate::detection::{detect, BeamKind, DetectionResult, FitState};
pub use crate::error::{CalibrationError, ConfigError, DetectionError, LuminosityError, StoreError};
pub use crate::live::{LiveConfig, LiveState};
pub use crate::protocol::{decode_commands, encode_outbound, EncodeContext, Measurement};
pub use crate::station::{BeamStation, FrameOutput};
pub use crate::store::{ConfigFiles, ConfigPersistence};

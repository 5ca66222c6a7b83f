use beam_math::LsqError;
use shared::config_storage::ConfigStorageError;
use thiserror::Error;

/// Reasons a frame produced no detected point.
///
/// All of these are transient: the caller reports "no point this frame" and
/// tries again on the next frame with the fit state it already has.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Preprocessing left no foreground region to trace.
    #[error("no contour found")]
    NoContourFound,

    /// Too few contour points survived the fit window.
    #[error("fit window [{left:.1}, {right:.1}] holds {points} points, need {needed}")]
    EmptyFitWindow {
        left: f64,
        right: f64,
        points: usize,
        needed: usize,
    },

    /// The least-squares solver did not converge.
    #[error("fit failed: {0}")]
    Fit(#[from] LsqError),

    /// The thresholded hotspot mask had zero mass.
    #[error("centroid undefined: thresholded mask is empty")]
    CentroidUndefined,

    /// The beam type selector named no known model.
    #[error("unknown beam type '{0}'")]
    UnknownBeamType(String),
}

/// Precondition failures while deriving calibration constants.
///
/// The step that raised one of these does not advance; the operator has to
/// fix the physical setup and retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// No beam point was detected at the tilt step.
    #[error("no detected point for the tilt reference")]
    NoReferencePoint,

    /// Tilt displacement was too small to give a usable slope.
    #[error("calibration slope {slope:.4} px/% is below the minimum {minimum:.4}")]
    SlopeTooSmall { slope: f64, minimum: f64 },

    /// Dark and bright readings are too close to solve a lux line.
    #[error("pixel luminosity delta {delta:.4} is too small")]
    PixelDeltaTooSmall { delta: f64 },

    /// The nominal target lux was missing or not positive.
    #[error("nominal lux {0} must be positive")]
    NonPositiveNominalLux(f64),

    /// Writing or reloading the configuration failed.
    #[error("could not persist configuration: {0}")]
    Persist(String),
}

/// Sensor-model inversion failures in the luminosity estimator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuminosityError {
    /// The sampling window fell entirely outside the frame.
    #[error("luminosity window is empty")]
    EmptyWindow,

    /// The mean level is beyond what the sensor model can invert.
    #[error("pixel level {level:.1} saturates the sensor model")]
    Saturated { level: f64 },

    /// Exposure must be positive to normalize the reading.
    #[error("invalid exposure {0}")]
    InvalidExposure(f64),
}

/// Configuration validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A configuration document could not be loaded or saved.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] ConfigStorageError),

    /// The document parsed but failed [`crate::config::StationConfig::validate`].
    #[error("{document}: {source}")]
    Invalid {
        document: &'static str,
        #[source]
        source: ConfigError,
    },
}

//! Pixel luminosity sampling and the linear lux calibration
//!
//! The mean level `r` of a small window next to the detected point is
//! inverted through the sensor response
//!
//! ```text
//! px = -(100000 / t) * ln(1 - r^g / (a * 255^(g-1)) + c / a),   a = 255 - c
//! ```
//!
//! where `t` is the exposure, `g` the sensor gamma and `c` its black offset.
//! Calibrated lux is then `m * px + q` with one line per beam family.

use ndarray::ArrayView2;
use shared::image_proc::window_mean;

use crate::config::{CalibrationConstants, LuminosityParams};
use crate::detection::BeamKind;
use crate::error::{CalibrationError, LuminosityError};

const EXPOSURE_SCALE: f64 = 100_000.0;

/// Smallest dark/bright difference a lux line can be solved from
pub const MIN_PIXEL_DELTA: f64 = 0.01;

/// Invert the sensor response for a mean level at a given exposure.
///
/// # Errors
/// * [`LuminosityError::InvalidExposure`] for a non-positive exposure
/// * [`LuminosityError::Saturated`] when the level is beyond the model
pub fn pixel_luminosity(level: f64, exposure: f64, params: &LuminosityParams) -> Result<f64, LuminosityError> {
    if !(exposure > 0.0) {
        return Err(LuminosityError::InvalidExposure(exposure));
    }
    let g = params.cam_g;
    let c = params.cam_c;
    let a = 255.0 - c;

    let arg = 1.0 - level.powf(g) / (a * 255f64.powf(g - 1.0)) + c / a;
    if !(arg > 0.0) {
        return Err(LuminosityError::Saturated { level });
    }
    Ok(-(EXPOSURE_SCALE / exposure) * arg.ln())
}

/// Pixel luminosity in the sampling window anchored at `point`.
///
/// The window is shifted from `point` by the configured offset, scaled to
/// the crop size, and clipped to the frame.
pub fn sample_pixel_luminosity(
    frame: &ArrayView2<u8>,
    point: (f64, f64),
    crop: (usize, usize),
    exposure: f64,
    params: &LuminosityParams,
) -> Result<f64, LuminosityError> {
    let (sx, sy) = params.offset(crop.0, crop.1);
    let level = window_mean(frame, (point.0 + sx, point.1 + sy), (params.lux_w, params.lux_h))
        .ok_or(LuminosityError::EmptyWindow)?;
    log::trace!("luminosity window mean {level:.2} at exposure {exposure}");
    pixel_luminosity(level, exposure, params)
}

/// `lux = m * px + q`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuxLine {
    pub m: f64,
    pub q: f64,
}

impl LuxLine {
    /// Calibrated line for a beam family
    pub fn for_kind(kind: BeamKind, constants: &CalibrationConstants) -> Self {
        if kind.is_high_beam() {
            Self {
                m: constants.lux_m_abb,
                q: constants.lux_q_abb,
            }
        } else {
            Self {
                m: constants.lux_m,
                q: constants.lux_q,
            }
        }
    }

    pub fn apply(&self, px: f64) -> f64 {
        self.m * px + self.q
    }

    /// Line through `(dark, 0)` and `(bright, nominal_lux)`.
    ///
    /// # Errors
    /// * [`CalibrationError::PixelDeltaTooSmall`] when the readings nearly coincide
    /// * [`CalibrationError::NonPositiveNominalLux`] for a missing target
    pub fn solve(dark: f64, bright: f64, nominal_lux: f64) -> Result<Self, CalibrationError> {
        let delta = bright - dark;
        if delta.abs() <= MIN_PIXEL_DELTA {
            return Err(CalibrationError::PixelDeltaTooSmall { delta });
        }
        if !(nominal_lux > 0.0) {
            return Err(CalibrationError::NonPositiveNominalLux(nominal_lux));
        }
        let m = nominal_lux / delta;
        Ok(Self { m, q: -m * dark })
    }
}

/// One frame's luminosity figures
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LuminosityReading {
    /// Uncalibrated sensor value
    pub px_lux: f64,
    /// Calibrated lux at 25 m
    pub lux: f64,
}

/// Measure luminosity at `point` with the lux line for `kind`.
///
/// Sampling failures read as zero and are logged at debug level.
pub fn measure(
    frame: &ArrayView2<u8>,
    point: (f64, f64),
    crop: (usize, usize),
    exposure: f64,
    kind: BeamKind,
    params: &LuminosityParams,
    constants: &CalibrationConstants,
) -> LuminosityReading {
    match sample_pixel_luminosity(frame, point, crop, exposure, params) {
        Ok(px_lux) => LuminosityReading {
            px_lux,
            lux: LuxLine::for_kind(kind, constants).apply(px_lux),
        },
        Err(e) => {
            log::debug!("luminosity unavailable: {e}");
            LuminosityReading::default()
        }
    }
}

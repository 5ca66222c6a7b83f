//! Beam pattern detection
//!
//! One entry point, [`detect`], dispatches on the beam kind: the low beam
//! is fitted with two joined lines, the fog beam with one line and the high
//! beam is located by the centroid of its hotspot. Every failure is
//! transient; the result carries no point and the cached [`FitState`] is
//! left as it was so the next frame retries from the same place.

use ndarray::ArrayView2;
use shared::image_proc::frame_stats;

pub mod angles;
pub mod centroid;
pub mod cutoff;
pub mod models;
pub mod preprocess;
pub mod smoothing;

pub use angles::{derive_angles, AngleContext, Angles};
pub use centroid::locate_hotspot;
pub use cutoff::{fit_one_segment, fit_two_segment, CutoffFit, FitState, Segment};
pub use preprocess::extract_contour;
pub use smoothing::PointSmoother;

use crate::config::DetectionParams;
use crate::error::DetectionError;

/// Detection model, one per supported beam type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamKind {
    /// Low beam: horizontal cutoff with a rising shoulder
    TwoSegment,
    /// Fog beam: flat cutoff
    OneSegment,
    /// High beam: no cutoff, brightest spot
    Centroid,
}

impl BeamKind {
    /// Map the controller's beam type name to a model
    pub fn from_beam_type(name: &str) -> Option<Self> {
        match name.trim() {
            "anabbagliante" => Some(BeamKind::TwoSegment),
            "fendinebbia" => Some(BeamKind::OneSegment),
            "abbagliante" => Some(BeamKind::Centroid),
            _ => None,
        }
    }

    pub fn beam_type(self) -> &'static str {
        match self {
            BeamKind::TwoSegment => "anabbagliante",
            BeamKind::OneSegment => "fendinebbia",
            BeamKind::Centroid => "abbagliante",
        }
    }

    /// Whether the high-beam lux line applies
    pub fn is_high_beam(self) -> bool {
        self == BeamKind::Centroid
    }
}

/// Per-frame figures kept for logging and display
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostics {
    /// Brightest input pixel
    pub peak: u8,
    /// Fraction of input pixels at full scale
    pub saturated_fraction: f64,
    pub fit_rms: Option<f64>,
    /// Horizontal extent of the fit window
    pub fit_window: Option<(f64, f64)>,
    pub failure: Option<DetectionError>,
}

/// Everything detected in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub kind: BeamKind,
    /// Reference point `(x, y)`; `None` only when detection failed
    pub point: Option<(f64, f64)>,
    /// Zero whenever `point` is `None`
    pub angles: Angles,
    pub segments: Vec<Segment>,
    /// Contour samples used by the line fit
    pub fitted_points: Vec<(f64, f64)>,
    /// Outer cutoff slope for line models
    pub slope: Option<f64>,
    pub diagnostics: Diagnostics,
}

impl DetectionResult {
    /// Result with no point, carrying the reason in the diagnostics.
    pub fn failed(kind: BeamKind, error: DetectionError, diagnostics: Diagnostics) -> Self {
        Self {
            kind,
            point: None,
            angles: Angles::default(),
            segments: Vec::new(),
            fitted_points: Vec::new(),
            slope: None,
            diagnostics: Diagnostics {
                failure: Some(error),
                ..diagnostics
            },
        }
    }

    pub fn is_detected(&self) -> bool {
        self.point.is_some()
    }

    pub fn failure(&self) -> Option<&DetectionError> {
        self.diagnostics.failure.as_ref()
    }
}

/// Locate the beam reference point in `frame` with the model for `kind`.
///
/// Never fails outright: errors end up in
/// [`Diagnostics::failure`] with `point == None` and zero angles.
pub fn detect(
    frame: &ArrayView2<u8>,
    kind: BeamKind,
    state: &mut FitState,
    params: &DetectionParams,
    angle_ctx: &AngleContext,
) -> DetectionResult {
    let (height, width) = frame.dim();
    let stats = frame_stats(frame);
    let mut diagnostics = Diagnostics {
        peak: stats.peak,
        saturated_fraction: stats.saturated_fraction,
        ..Diagnostics::default()
    };

    let outcome = match kind {
        BeamKind::TwoSegment => extract_contour(frame, params)
            .and_then(|contour| fit_two_segment(&contour, width, state, params)),
        BeamKind::OneSegment => extract_contour(frame, params)
            .and_then(|contour| fit_one_segment(&contour, width, state, params)),
        BeamKind::Centroid => locate_hotspot(frame, params.centroid_threshold).map(|point| CutoffFit {
            point,
            slope: 0.0,
            segments: Vec::new(),
            samples: Vec::new(),
            rms: 0.0,
            window: (0.0, 0.0),
            params: vec![point.0, point.1],
        }),
    };

    match outcome {
        Ok(fit) => {
            let slope = (kind != BeamKind::Centroid).then_some(fit.slope);
            if slope.is_some() {
                diagnostics.fit_rms = Some(fit.rms);
                diagnostics.fit_window = Some(fit.window);
            }
            DetectionResult {
                kind,
                point: Some(fit.point),
                angles: derive_angles(fit.point, slope, (width, height), angle_ctx),
                segments: fit.segments,
                fitted_points: fit.samples,
                slope,
                diagnostics,
            }
        }
        Err(e) => {
            log::debug!("{} detection failed: {e}", kind.beam_type());
            DetectionResult::failed(kind, e, diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2};

    fn angle_ctx() -> AngleContext {
        AngleContext {
            qin: Some(2.0),
            tilt_px: 0.0,
            focal_constant: 25.0,
        }
    }

    #[test]
    fn test_beam_type_names() {
        for kind in [BeamKind::TwoSegment, BeamKind::OneSegment, BeamKind::Centroid] {
            assert_eq!(BeamKind::from_beam_type(kind.beam_type()), Some(kind));
        }
        assert_eq!(BeamKind::from_beam_type("calibrazione"), None);
    }

    #[test]
    fn test_dark_frame_fails_without_touching_state() {
        let frame = Array2::from_elem((120, 160), 10u8);
        let mut state = FitState::new();
        state.last_x0 = 77.0;

        let result = detect(
            &frame.view(),
            BeamKind::TwoSegment,
            &mut state,
            &DetectionParams::default(),
            &angle_ctx(),
        );

        assert!(!result.is_detected());
        assert_eq!(result.angles, Angles::default());
        assert_eq!(result.failure(), Some(&DetectionError::NoContourFound));
        assert_eq!(result.diagnostics.peak, 10);
        assert_eq!(state.last_x0, 77.0);
    }

    #[test]
    fn test_centroid_has_no_slope_or_segments() {
        let mut frame = Array2::from_elem((120, 160), 20u8);
        frame.slice_mut(s![50..70, 70..90]).fill(255);
        let mut state = FitState::new();

        let result = detect(
            &frame.view(),
            BeamKind::Centroid,
            &mut state,
            &DetectionParams::default(),
            &angle_ctx(),
        );

        assert_eq!(result.point, Some((79.5, 59.5)));
        assert_eq!(result.slope, None);
        assert!(result.segments.is_empty());
        assert_eq!(result.angles.roll, 0.0);
        assert!(result.diagnostics.saturated_fraction > 0.0);
        assert_eq!(state, FitState::new());
    }

    #[test]
    fn test_centroid_failure_is_reported() {
        let frame = Array2::from_elem((40, 40), 100u8);
        let result = detect(
            &frame.view(),
            BeamKind::Centroid,
            &mut FitState::new(),
            &DetectionParams::default(),
            &angle_ctx(),
        );
        assert_eq!(result.failure(), Some(&DetectionError::CentroidUndefined));
    }
}

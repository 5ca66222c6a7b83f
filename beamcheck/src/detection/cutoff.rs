//! Line fits of the beam cutoff over the upper contour

use beam_math::{curve_fit, Bounds, CurveModel, FitReport, LsqError};
use shared::image_proc::Contour;

use super::models::{OneSegmentModel, TwoSegmentModel};
use crate::config::DetectionParams;
use crate::error::DetectionError;

/// Junction x assumed before the first accepted fit
const INITIAL_X0: f64 = 300.0;

/// Fit continuity carried from frame to frame.
///
/// After each accepted fit the window's right edge is latched to the contour
/// extent of that frame, so the window cannot creep outward while exposure
/// is still settling. [`FitState::reset_window`] releases the latch.
#[derive(Debug, Clone, PartialEq)]
pub struct FitState {
    pub last_x0: f64,
    pub last_y0: f64,
    /// RMS residual of the last accepted fit
    pub last_residual: f64,
    /// Right edge of the fit window; `None` until a contour has been seen
    pub right_bound: Option<f64>,
}

impl Default for FitState {
    fn default() -> Self {
        Self {
            last_x0: INITIAL_X0,
            last_y0: 0.0,
            last_residual: f64::INFINITY,
            right_bound: None,
        }
    }
}

impl FitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the latched window and residual; called on exposure convergence.
    pub fn reset_window(&mut self) {
        self.last_residual = f64::INFINITY;
        self.right_bound = None;
    }
}

/// Line segment `(x1, y1) -> (x2, y2)` in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

/// Outcome of a cutoff fit
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffFit {
    /// Reported reference point
    pub point: (f64, f64),
    /// Outer slope, drives roll
    pub slope: f64,
    pub segments: Vec<Segment>,
    /// Contour samples the model was fitted to
    pub samples: Vec<(f64, f64)>,
    pub rms: f64,
    /// Horizontal extent of the fit window
    pub window: (f64, f64),
    /// Fitted model parameters, `[X0, Y0, mo, mi]` or `[X0, Y0, mo]`
    pub params: Vec<f64>,
}

/// Contour samples inside the fit window
struct FitWindow {
    left: f64,
    right: f64,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl FitWindow {
    /// Keep contour points in `[left, right]` at or above row `y_limit`.
    fn select(contour: &Contour, left: f64, right: f64, y_limit: f64, needed: usize) -> Result<Self, DetectionError> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = contour
            .points
            .iter()
            .filter(|&&(x, y)| x >= left && x <= right && y <= y_limit)
            .copied()
            .unzip();

        if xs.len() < needed {
            return Err(DetectionError::EmptyFitWindow {
                left,
                right,
                points: xs.len(),
                needed,
            });
        }
        Ok(Self { left, right, xs, ys })
    }

    fn x_range(&self) -> (f64, f64) {
        min_max(&self.xs)
    }

    fn y_max(&self) -> f64 {
        min_max(&self.ys).1
    }

    fn x_mean(&self) -> f64 {
        self.xs.iter().sum::<f64>() / self.xs.len() as f64
    }

    fn samples(&self) -> Vec<(f64, f64)> {
        self.xs.iter().copied().zip(self.ys.iter().copied()).collect()
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Leftmost point, topmost among equal x
fn leftmost_upper(contour: &Contour) -> Option<(f64, f64)> {
    contour
        .points
        .iter()
        .copied()
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
}

/// Topmost point, leftmost among equal y
fn topmost(contour: &Contour) -> Option<(f64, f64)> {
    contour
        .points
        .iter()
        .copied()
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)))
}

/// Window edges from the contour extent and the latched right bound.
///
/// Latches `x_max` on first use.
fn window_edges(state: &mut FitState, x_min: f64, x_max: f64, margin: f64) -> (f64, f64) {
    let latched = *state.right_bound.get_or_insert(x_max);
    (x_min + margin, x_max.min(latched) - margin)
}

fn run_fit<M: CurveModel>(
    model: &M,
    window: &FitWindow,
    p0: &[f64],
    bounds: &Bounds,
    params: &DetectionParams,
) -> Result<FitReport, DetectionError> {
    Ok(curve_fit(
        model,
        &window.xs,
        &window.ys,
        p0,
        bounds,
        &params.fit_options(),
    )?)
}

/// Fit the two-line cutoff of a low beam.
///
/// On success the junction becomes the reported point and is cached in
/// `state` together with the latched right bound. On failure `state` keeps
/// its previous fit.
pub fn fit_two_segment(
    contour: &Contour,
    frame_width: usize,
    state: &mut FitState,
    params: &DetectionParams,
) -> Result<CutoffFit, DetectionError> {
    let model = TwoSegmentModel;
    let (x_min, y_h) = leftmost_upper(contour).ok_or(DetectionError::NoContourFound)?;
    let (x_max, _) = topmost(contour).ok_or(DetectionError::NoContourFound)?;

    let (left, right) = window_edges(state, x_min, x_max, params.window_margin);
    log::debug!(
        "two-segment fit: last X0 {:.1}, window [{left:.1}, {right:.1}]",
        state.last_x0
    );
    let window = FitWindow::select(contour, left, right, y_h, model.num_params())?;

    let (lo_x, hi_x) = window.x_range();
    let y_max = window.y_max();
    let p0 = [window.x_mean(), y_max - 1.0, -0.01, -1.0];
    let bounds = Bounds::new(
        vec![lo_x, 0.0, -0.5, f64::NEG_INFINITY],
        vec![hi_x, y_max, 0.0, 0.0],
    )?;

    let report = run_fit(&model, &window, &p0, &bounds, params)?;
    let p = report.params.as_slice();
    if !TwoSegmentModel::is_feasible(p) {
        return Err(LsqError::NoSolution.into());
    }
    let (x0, y0, mo) = (p[0], p[1], p[2]);

    state.last_x0 = x0;
    state.last_y0 = y0;
    state.last_residual = report.rms;
    state.right_bound = Some(x_max);

    let w = frame_width as f64;
    let start = (0.0, model.value(0.0, p));
    let junction = (x0, y0);
    let end = (w, model.value(w, p));

    Ok(CutoffFit {
        point: junction,
        slope: mo,
        segments: vec![
            Segment { start, end: junction },
            Segment { start: junction, end },
        ],
        samples: window.samples(),
        rms: report.rms,
        window: (window.left, window.right),
        params: p.to_vec(),
    })
}

/// Fit the single-line cutoff of a fog beam.
///
/// The reported x is the middle of the fitted span, truncated to a whole
/// pixel; the reported y is the fitted `Y0`.
pub fn fit_one_segment(
    contour: &Contour,
    frame_width: usize,
    state: &mut FitState,
    params: &DetectionParams,
) -> Result<CutoffFit, DetectionError> {
    let model = OneSegmentModel;
    let (_, y_h) = leftmost_upper(contour).ok_or(DetectionError::NoContourFound)?;
    let (x_min, x_max) = contour.x_span().ok_or(DetectionError::NoContourFound)?;

    let (left, right) = window_edges(state, x_min, x_max, params.window_margin);
    log::debug!("one-segment fit: window [{left:.1}, {right:.1}]");
    let window = FitWindow::select(contour, left, right, y_h, model.num_params())?;

    let (lo_x, hi_x) = window.x_range();
    let y_max = window.y_max();
    let p0 = [window.x_mean(), y_max - 1.0, -0.01];
    let bounds = Bounds::new(
        vec![lo_x, 0.0, f64::NEG_INFINITY],
        vec![hi_x, y_max, f64::INFINITY],
    )?;

    let report = run_fit(&model, &window, &p0, &bounds, params)?;
    let p = report.params.as_slice();
    let mid_x = ((lo_x + hi_x) / 2.0).floor();
    let point = (mid_x, p[1]);

    state.last_x0 = point.0;
    state.last_y0 = point.1;
    state.last_residual = report.rms;
    state.right_bound = Some(x_max);

    let w = frame_width as f64;
    Ok(CutoffFit {
        point,
        slope: p[2],
        segments: vec![Segment {
            start: (0.0, model.value(0.0, p)),
            end: (w, model.value(w, p)),
        }],
        samples: window.samples(),
        rms: report.rms,
        window: (window.left, window.right),
        params: p.to_vec(),
    })
}

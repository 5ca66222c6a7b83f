//! Bounded least squares for scalar curve models
//!
//! Fits the parameters `p` of a model `y = f(x; p)` to a set of samples with
//! the Levenberg-Marquardt optimizer from `tiny_solver`. Every sample becomes
//! a one-dimensional residual block on a single parameter vector `"p"`, and
//! box constraints are carried as per-component variable bounds.
//!
//! Models are written once, generic over the scalar type, so the optimizer
//! can differentiate them automatically. A model may reject infeasible
//! parameter combinations by returning a large sentinel value; the optimizer
//! sees the cost jump and backs off like for any other bad step.

use std::collections::HashMap;

use thiserror::Error;
use tiny_solver::factors::na as ts_na;
use tiny_solver::Optimizer;

const PARAMS: &str = "p";

/// Errors that can occur during curve fitting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LsqError {
    #[error("Invalid argument: {0}")]
    ArgumentError(String),

    #[error("Insufficient data: {points} points for {params} parameters")]
    InsufficientData { points: usize, params: usize },

    #[error("Residual is not finite at the initial guess")]
    NonFiniteResidual,

    #[error("Optimizer returned no solution")]
    NoSolution,
}

/// A scalar model `y = f(x; p)`.
pub trait CurveModel: Clone + Send + Sync + 'static {
    /// Number of free parameters.
    fn num_params(&self) -> usize;

    /// Evaluate the model at `x`.
    fn value<T: ts_na::RealField>(&self, x: T, params: &[T]) -> T;
}

/// Lift an `f64` constant into the optimizer's scalar type
pub fn constant<T: ts_na::RealField>(v: f64) -> T {
    ts_na::convert(v)
}

/// Per-parameter box constraints. Use infinities for open sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Create bounds, checking that both sides agree in length and order.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, LsqError> {
        if lower.len() != upper.len() {
            return Err(LsqError::ArgumentError(format!(
                "bounds length mismatch: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        if let Some(i) = lower
            .iter()
            .zip(&upper)
            .position(|(lo, hi)| lo.is_nan() || hi.is_nan() || lo > hi)
        {
            return Err(LsqError::ArgumentError(format!(
                "invalid bound for parameter {i}: [{}, {}]",
                lower[i], upper[i]
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Bounds that leave every parameter free.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Project `params` onto the feasible box in place.
    pub fn clamp(&self, params: &mut [f64]) {
        for ((p, lo), hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.max(*lo).min(*hi);
        }
    }

    pub fn contains(&self, params: &[f64]) -> bool {
        params
            .iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .all(|((p, lo), hi)| p >= lo && p <= hi)
    }

    /// Components with at least one finite side
    fn constrained(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        self.lower
            .iter()
            .zip(&self.upper)
            .enumerate()
            .filter(|(_, (lo, hi))| lo.is_finite() || hi.is_finite())
            .map(|(i, (&lo, &hi))| (i, lo, hi))
    }
}

/// Termination settings for [`curve_fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Maximum number of optimizer iterations
    pub max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

/// Result of a successful fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Fitted parameters, always inside the bounds
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`
    pub cost: f64,
    /// Root mean square residual
    pub rms: f64,
}

/// Residual of one sample against the model
struct SampleFactor<M> {
    model: M,
    x: f64,
    y: f64,
}

impl<M: CurveModel, T: ts_na::RealField> tiny_solver::factors::Factor<T> for SampleFactor<M> {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let p = params[0].as_slice();
        let r = self.model.value(constant::<T>(self.x), p) - constant::<T>(self.y);
        ts_na::DVector::<T>::from_vec(vec![r])
    }
}

fn sum_squares<M: CurveModel>(model: &M, xs: &[f64], ys: &[f64], params: &[f64]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = model.value(x, params) - y;
            r * r
        })
        .sum()
}

/// Fit `model` to the samples `(xs[i], ys[i])` starting from `p0`.
///
/// The initial guess is projected into `bounds` before the optimizer starts,
/// and the optimizer keeps every iterate inside them.
///
/// # Errors
///
/// * [`LsqError::ArgumentError`] if the inputs disagree in length
/// * [`LsqError::InsufficientData`] if there are fewer samples than parameters
/// * [`LsqError::NonFiniteResidual`] if the projected initial guess has no finite cost
/// * [`LsqError::NoSolution`] if the optimizer gives up without a result
pub fn curve_fit<M: CurveModel>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    p0: &[f64],
    bounds: &Bounds,
    options: &FitOptions,
) -> Result<FitReport, LsqError> {
    let n = model.num_params();
    let m = xs.len();

    if p0.len() != n || bounds.len() != n {
        return Err(LsqError::ArgumentError(format!(
            "model has {n} parameters but got {} initial values and {} bounds",
            p0.len(),
            bounds.len()
        )));
    }
    if ys.len() != m {
        return Err(LsqError::ArgumentError(format!(
            "sample length mismatch: {m} x values vs {} y values",
            ys.len()
        )));
    }
    if m < n {
        return Err(LsqError::InsufficientData {
            points: m,
            params: n,
        });
    }

    let mut start = p0.to_vec();
    bounds.clamp(&mut start);
    if !sum_squares(model, xs, ys, &start).is_finite() {
        return Err(LsqError::NonFiniteResidual);
    }

    let mut problem = tiny_solver::Problem::new();
    for (&x, &y) in xs.iter().zip(ys) {
        problem.add_residual_block(
            1,
            &[PARAMS],
            Box::new(SampleFactor {
                model: model.clone(),
                x,
                y,
            }),
            None,
        );
    }
    for (i, lo, hi) in bounds.constrained() {
        problem.set_variable_bounds(PARAMS, i, lo, hi);
    }

    let mut initial_values = HashMap::<String, ts_na::DVector<f64>>::new();
    initial_values.insert(PARAMS.to_string(), ts_na::DVector::<f64>::from_vec(start));

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let solver_options = tiny_solver::OptimizerOptions {
        max_iteration: options.max_iterations.max(1),
        verbosity_level: 0,
        ..Default::default()
    };
    let result = optimizer
        .optimize(&problem, &initial_values, Some(solver_options))
        .ok_or(LsqError::NoSolution)?;
    let solved = result.get(PARAMS).ok_or(LsqError::NoSolution)?;

    let mut params: Vec<f64> = solved.iter().copied().collect();
    bounds.clamp(&mut params);
    let cost = sum_squares(model, xs, ys, &params);
    if !cost.is_finite() {
        return Err(LsqError::NoSolution);
    }

    Ok(FitReport {
        params,
        cost,
        rms: (cost / m as f64).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[derive(Clone)]
    struct Line;

    impl CurveModel for Line {
        fn num_params(&self) -> usize {
            2
        }

        fn value<T: ts_na::RealField>(&self, x: T, p: &[T]) -> T {
            p[0].clone() * x + p[1].clone()
        }
    }

    /// y = a * exp(b * x), nonlinear in b
    #[derive(Clone)]
    struct Exponential;

    impl CurveModel for Exponential {
        fn num_params(&self) -> usize {
            2
        }

        fn value<T: ts_na::RealField>(&self, x: T, p: &[T]) -> T {
            p[0].clone() * (p[1].clone() * x).exp()
        }
    }

    #[test]
    fn test_fit_exact_line() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| -0.5 * x + 12.0).collect();

        let report = curve_fit(
            &Line,
            &xs,
            &ys,
            &[0.0, 0.0],
            &Bounds::unbounded(2),
            &FitOptions::default(),
        )
        .unwrap();

        assert_abs_diff_eq!(report.params[0], -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 12.0, epsilon = 1e-6);
        assert!(report.rms < 1e-6);
    }

    #[test]
    fn test_fit_exponential() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * (-0.7 * x).exp()).collect();

        let report = curve_fit(
            &Exponential,
            &xs,
            &ys,
            &[1.0, -0.1],
            &Bounds::unbounded(2),
            &FitOptions::default(),
        )
        .unwrap();

        assert_abs_diff_eq!(report.params[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(report.params[1], -0.7, epsilon = 1e-4);
    }

    #[test]
    fn test_bounds_are_respected() {
        // Symmetric samples decouple slope and intercept
        let xs: Vec<f64> = (-5..=5).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 3.0).collect();
        let bounds = Bounds::new(vec![-1.0, -100.0], vec![1.0, 100.0]).unwrap();

        let report = curve_fit(&Line, &xs, &ys, &[0.0, 0.0], &bounds, &FitOptions::default())
            .unwrap();

        assert!(bounds.contains(&report.params));
        assert_abs_diff_eq!(report.params[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_initial_guess_is_projected() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 0.0, 0.0];
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();

        let report = curve_fit(&Line, &xs, &ys, &[5.0, -5.0], &bounds, &FitOptions::default())
            .unwrap();

        assert!(bounds.contains(&report.params));
    }

    #[test]
    fn test_insufficient_data() {
        let err = curve_fit(
            &Line,
            &[1.0],
            &[1.0],
            &[0.0, 0.0],
            &Bounds::unbounded(2),
            &FitOptions::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            LsqError::InsufficientData {
                points: 1,
                params: 2
            }
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = curve_fit(
            &Line,
            &[1.0, 2.0, 3.0],
            &[1.0, 2.0],
            &[0.0, 0.0],
            &Bounds::unbounded(2),
            &FitOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, LsqError::ArgumentError(_)));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(Bounds::new(vec![1.0], vec![0.0]).is_err());
        assert!(Bounds::new(vec![0.0, 0.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_non_finite_start() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, f64::NAN, 0.0];

        let err = curve_fit(
            &Line,
            &xs,
            &ys,
            &[0.0, 0.0],
            &Bounds::unbounded(2),
            &FitOptions::default(),
        )
        .unwrap_err();

        assert_eq!(err, LsqError::NonFiniteResidual);
    }
}

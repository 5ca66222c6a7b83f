//! beam-math - Numerical routines for headlight beam analysis
//!
//! This crate provides the small amount of numerical machinery the beam
//! measurement pipeline depends on:
//!
//! - **Least squares** - Bounded Levenberg-Marquardt fitting of scalar curve models on `tiny_solver`
//! - **Statistics** - Robust summaries (median) used for point smoothing
//!
//! # Example
//!
//! ```text
//! use beam_math::{curve_fit, Bounds, CurveModel, FitOptions, RealField};
//!
//! #[derive(Clone)]
//! struct Line;
//! impl CurveModel for Line {
//!     fn num_params(&self) -> usize { 2 }
//!     fn value<T: RealField>(&self, x: T, p: &[T]) -> T { p[0].clone() * x + p[1].clone() }
//! }
//!
//! let xs = [0.0, 1.0, 2.0, 3.0];
//! let ys = [1.0, 3.0, 5.0, 7.0];
//! let report = curve_fit(&Line, &xs, &ys, &[0.0, 0.0], &Bounds::unbounded(2), &FitOptions::default())?;
//! ```

pub mod lsq;
pub mod stats;

pub use lsq::{constant, curve_fit, Bounds, CurveModel, FitOptions, FitReport, LsqError};
pub use stats::median;
pub use tiny_solver::factors::na::RealField;

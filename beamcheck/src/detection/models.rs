//! Cutoff line models fitted to the upper beam contour

use beam_math::{constant, CurveModel, RealField};

/// Residual value returned for parameter sets that break the slope ordering
pub const INFEASIBLE_RESIDUAL: f64 = 1e6;

/// Two lines meeting at `(X0, Y0)`: outer slope `mo` left of the junction,
/// inner slope `mi` right of it.
///
/// Parameters are `[X0, Y0, mo, mi]`. The inner line must not be shallower
/// than the outer one (`mi <= mo`); other combinations evaluate to
/// [`INFEASIBLE_RESIDUAL`] everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoSegmentModel;

impl TwoSegmentModel {
    pub fn is_feasible(params: &[f64]) -> bool {
        params[3] <= params[2]
    }
}

impl CurveModel for TwoSegmentModel {
    fn num_params(&self) -> usize {
        4
    }

    fn value<T: RealField>(&self, x: T, p: &[T]) -> T {
        let (x0, y0, mo, mi) = (p[0].clone(), p[1].clone(), p[2].clone(), p[3].clone());
        if mi > mo {
            return constant(INFEASIBLE_RESIDUAL);
        }
        let slope = if x <= x0 { mo } else { mi };
        y0 + slope * (x - x0)
    }
}

/// Single line through `(X0, Y0)` with slope `mo`; parameters `[X0, Y0, mo]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneSegmentModel;

impl CurveModel for OneSegmentModel {
    fn num_params(&self) -> usize {
        3
    }

    fn value<T: RealField>(&self, x: T, p: &[T]) -> T {
        p[2].clone() * (x - p[0].clone()) + p[1].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_segment_branches() {
        let p = [100.0, 50.0, 0.0, -0.5];
        assert_eq!(TwoSegmentModel.value(80.0, &p), 50.0);
        assert_eq!(TwoSegmentModel.value(100.0, &p), 50.0);
        assert_eq!(TwoSegmentModel.value(120.0, &p), 40.0);
    }

    #[test]
    fn test_two_segment_infeasible() {
        let p = [100.0, 50.0, -0.5, 0.0];
        assert!(!TwoSegmentModel::is_feasible(&p));
        assert_eq!(TwoSegmentModel.value(10.0, &p), INFEASIBLE_RESIDUAL);
        assert_eq!(TwoSegmentModel.value(150.0, &p), INFEASIBLE_RESIDUAL);
    }

    #[test]
    fn test_one_segment() {
        let p = [10.0, 5.0, 2.0];
        assert_eq!(OneSegmentModel.value(12.0, &p), 9.0);
        assert_eq!(OneSegmentModel.value(10.0, &p), 5.0);
    }
}

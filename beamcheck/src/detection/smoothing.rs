//! Median smoothing of detected points across frames

use std::collections::VecDeque;

use beam_math::median;

use super::BeamKind;

/// Per-axis running median over the last `window` detected points.
///
/// A window of 0 or 1 passes points through unchanged. The history belongs
/// to one beam kind and is dropped only when the kind changes; frames without
/// a detection leave it alone.
#[derive(Debug, Clone)]
pub struct PointSmoother {
    window: usize,
    kind: Option<BeamKind>,
    history: VecDeque<(f64, f64)>,
}

impl PointSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            kind: None,
            history: VecDeque::with_capacity(window.max(1)),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Change the window length, trimming the oldest samples if it shrank.
    pub fn set_window(&mut self, window: usize) {
        self.window = window.max(1);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Add a point detected with `kind` and return the smoothed point.
    pub fn push(&mut self, kind: BeamKind, point: (f64, f64)) -> (f64, f64) {
        if self.kind != Some(kind) {
            self.history.clear();
            self.kind = Some(kind);
        }
        if self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(point);

        let xs: Vec<f64> = self.history.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = self.history.iter().map(|p| p.1).collect();
        match (median(&xs), median(&ys)) {
            (Some(x), Some(y)) => (x, y),
            _ => point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_of_one_is_passthrough() {
        let mut smoother = PointSmoother::new(1);
        assert_eq!(smoother.push(BeamKind::TwoSegment, (1.0, 2.0)), (1.0, 2.0));
        assert_eq!(smoother.push(BeamKind::TwoSegment, (9.0, 8.0)), (9.0, 8.0));
        assert_eq!(smoother.len(), 1);
    }

    #[test]
    fn test_median_rejects_outlier() {
        let mut smoother = PointSmoother::new(3);
        smoother.push(BeamKind::TwoSegment, (100.0, 50.0));
        smoother.push(BeamKind::TwoSegment, (101.0, 51.0));
        let p = smoother.push(BeamKind::TwoSegment, (300.0, 10.0));
        assert_eq!(p, (101.0, 50.0));

        // Oldest sample leaves the window
        let p = smoother.push(BeamKind::TwoSegment, (102.0, 52.0));
        assert_eq!(p, (102.0, 51.0));
    }

    #[test]
    fn test_kind_change_clears_history() {
        let mut smoother = PointSmoother::new(5);
        smoother.push(BeamKind::TwoSegment, (100.0, 50.0));
        smoother.push(BeamKind::TwoSegment, (100.0, 50.0));

        let p = smoother.push(BeamKind::Centroid, (10.0, 20.0));
        assert_eq!(p, (10.0, 20.0));
        assert_eq!(smoother.len(), 1);
    }
}

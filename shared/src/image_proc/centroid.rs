//! Raw image moments of thresholded frames
//!
//! Only the zeroth and first order moments are needed to place a beam
//! hotspot: every foreground pixel has unit mass, so the centroid is the
//! mean pixel position of the foreground.

use ndarray::ArrayView2;

/// Zeroth and first order raw moments
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    /// Total mass (foreground pixel count)
    pub m00: f64,
    /// Sum of x (column) coordinates
    pub m10: f64,
    /// Sum of y (row) coordinates
    pub m01: f64,
}

impl Moments {
    /// Center of mass as `(x, y)`, or `None` for an empty mask.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }

    fn accumulate(&mut self, row: usize, col: usize) {
        self.m00 += 1.0;
        self.m10 += col as f64;
        self.m01 += row as f64;
    }
}

/// Moments of an 8-bit image treating every non-zero pixel as unit mass
pub fn nonzero_moments(frame: &ArrayView2<u8>) -> Moments {
    let mut moments = Moments::default();
    for ((row, col), &v) in frame.indexed_iter() {
        if v != 0 {
            moments.accumulate(row, col);
        }
    }
    moments
}

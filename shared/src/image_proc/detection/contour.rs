//! Outer contours of binary regions

use super::thresholding::{component_sizes, connected_components};
use ndarray::{Array2, ArrayView2};

/// Boundary pixels of the largest foreground region
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Boundary points as `(x, y)` in raster order
    pub points: Vec<(f64, f64)>,
    /// Pixel count of the enclosed region
    pub area: usize,
}

impl Contour {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest and largest x over the contour
    pub fn x_span(&self) -> Option<(f64, f64)> {
        let mut iter = self.points.iter().map(|p| p.0);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))))
    }
}

fn is_boundary<F: Fn(usize, usize) -> bool>(
    inside: F,
    row: usize,
    col: usize,
    height: usize,
    width: usize,
) -> bool {
    row == 0
        || col == 0
        || row + 1 == height
        || col + 1 == width
        || !inside(row - 1, col)
        || !inside(row + 1, col)
        || !inside(row, col - 1)
        || !inside(row, col + 1)
}

/// Boundary of the largest 4-connected region in `mask`.
///
/// Ties in area go to the region found first in raster order. Returns
/// `None` when the mask has no foreground.
pub fn largest_contour(mask: &ArrayView2<bool>) -> Option<Contour> {
    let (labels, count) = connected_components(mask);
    if count == 0 {
        return None;
    }

    let sizes = component_sizes(&labels.view(), count);
    let (best, area) = sizes
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, 0), |(best, area), (label, &size)| {
            if size > area {
                (label, size)
            } else {
                (best, area)
            }
        });

    let (height, width) = labels.dim();
    let points = labels
        .indexed_iter()
        .filter(|&((row, col), &label)| {
            label == best && is_boundary(|r, c| labels[[r, c]] == best, row, col, height, width)
        })
        .map(|((row, col), _)| (col as f64, row as f64))
        .collect();

    Some(Contour { points, area })
}

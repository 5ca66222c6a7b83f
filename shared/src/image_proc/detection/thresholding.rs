//! Binary thresholding and connected component labeling
//!
//! Masks are `Array2<bool>` with `true` marking foreground. Labels are
//! `usize` with `0` reserved for background and components numbered
//! consecutively from `1` in raster order of their first pixel.

use ndarray::{s, Array2, ArrayView2};

/// Foreground wherever the pixel is strictly brighter than `level`.
pub fn threshold_binary(frame: &ArrayView2<u8>, level: u8) -> Array2<bool> {
    frame.mapv(|v| v > level)
}

/// Clear a `margin` pixel band along all four edges of the mask.
pub fn zero_border(mask: &mut Array2<bool>, margin: usize) {
    let (height, width) = mask.dim();
    let m_rows = margin.min(height);
    let m_cols = margin.min(width);

    mask.slice_mut(s![..m_rows, ..]).fill(false);
    mask.slice_mut(s![height - m_rows.., ..]).fill(false);
    mask.slice_mut(s![.., ..m_cols]).fill(false);
    mask.slice_mut(s![.., width - m_cols..]).fill(false);
}

fn find_root(parents: &mut [usize], label: usize) -> usize {
    let mut current = label;
    while current != parents[current] {
        parents[current] = parents[parents[current]];
        current = parents[current];
    }
    current
}

fn union_labels(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find_root(parents, a);
    let root_b = find_root(parents, b);
    if root_a < root_b {
        parents[root_b] = root_a;
    } else if root_b < root_a {
        parents[root_a] = root_b;
    }
}

/// Label 4-connected foreground regions with a two-pass union-find.
///
/// # Returns
/// The label image and the number of components found.
pub fn connected_components(mask: &ArrayView2<bool>) -> (Array2<usize>, usize) {
    let (height, width) = mask.dim();
    let mut labels = Array2::<usize>::zeros((height, width));
    // parents[0] is the background sentinel
    let mut parents = vec![0usize];

    for row in 0..height {
        for col in 0..width {
            if !mask[[row, col]] {
                continue;
            }
            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up, left) {
                (0, 0) => {
                    let label = parents.len();
                    parents.push(label);
                    label
                }
                (0, l) | (l, 0) => l,
                (u, l) => {
                    if u != l {
                        union_labels(&mut parents, u, l);
                    }
                    u.min(l)
                }
            };
        }
    }

    // Resolve provisional labels to consecutive final labels
    let mut relabel = vec![0usize; parents.len()];
    let mut count = 0;
    for label in 1..parents.len() {
        let root = find_root(&mut parents, label);
        if relabel[root] == 0 {
            count += 1;
            relabel[root] = count;
        }
        relabel[label] = relabel[root];
    }

    labels.mapv_inplace(|l| relabel[l]);
    (labels, count)
}

/// Pixel count of each component; index `0` is the background.
pub fn component_sizes(labels: &ArrayView2<usize>, count: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; count + 1];
    for &label in labels.iter() {
        if label <= count {
            sizes[label] += 1;
        }
    }
    sizes
}

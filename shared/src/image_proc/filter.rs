//! Separable Gaussian smoothing for 8-bit frames

use ndarray::{Array2, ArrayView2};

/// Build a normalized 1D Gaussian kernel of odd length `ksize`.
///
/// A non-positive `sigma` selects the conventional automatic width. For
/// kernels of up to seven taps that means the fixed binomial tables; larger
/// kernels use `sigma = 0.3·((ksize−1)/2 − 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f64> {
    let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize.max(1) };

    if sigma <= 0.0 {
        match ksize {
            1 => return vec![1.0],
            3 => return vec![0.25, 0.5, 0.25],
            5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => {
                return vec![
                    0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
                ]
            }
            _ => {}
        }
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let half = (ksize / 2) as f64;
    let mut kernel: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge.
fn reflect_101(index: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as i64;
    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Blur with a `ksize × ksize` Gaussian, applied as two 1D passes.
///
/// Borders are handled by reflection about the edge pixel. Results are
/// rounded back to 8 bits.
pub fn gaussian_blur(frame: &ArrayView2<u8>, ksize: usize, sigma: f64) -> Array2<u8> {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 {
        return Array2::zeros((height, width));
    }
    let kernel = gaussian_kernel(ksize, sigma);
    let half = (kernel.len() / 2) as i64;

    let mut horizontal = Array2::<f64>::zeros((height, width));
    for ((row, col), value) in horizontal.indexed_iter_mut() {
        *value = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let c = reflect_101(col as i64 + k as i64 - half, width);
                w * f64::from(frame[[row, c]])
            })
            .sum();
    }

    let mut out = Array2::<u8>::zeros((height, width));
    for ((row, col), value) in out.indexed_iter_mut() {
        let acc: f64 = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let r = reflect_101(row as i64 + k as i64 - half, height);
                w * horizontal[[r, col]]
            })
            .sum();
        *value = acc.round().clamp(0.0, 255.0) as u8;
    }
    out
}

//! Frame conversion and whole-image operations

use image::DynamicImage;
use ndarray::{s, Array2, ArrayView2};

/// Convert any decoded image to an 8-bit luma array indexed `[[row, col]]`.
pub fn luma_from_dynamic(img: &DynamicImage) -> Array2<u8> {
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        luma.get_pixel(col as u32, row as u32)[0]
    })
}

/// Stretch intensities linearly so the minimum maps to 0 and the maximum to 255.
///
/// A constant image maps to all zeros.
pub fn normalize_min_max(frame: &ArrayView2<u8>) -> Array2<u8> {
    let min = frame.iter().copied().min().unwrap_or(0);
    let max = frame.iter().copied().max().unwrap_or(0);
    if max == min {
        return Array2::zeros(frame.dim());
    }
    let scale = 255.0 / f64::from(max - min);
    frame.mapv(|v| (f64::from(v - min) * scale).round().clamp(0.0, 255.0) as u8)
}

/// Add a constant offset to every pixel, saturating at 0 and 255.
pub fn brighten(frame: &ArrayView2<u8>, beta: i16) -> Array2<u8> {
    frame.mapv(|v| (i16::from(v) + beta).clamp(0, 255) as u8)
}

/// Mirror the frame left to right.
pub fn flip_horizontal(frame: &ArrayView2<u8>) -> Array2<u8> {
    frame.slice(s![.., ..;-1]).to_owned()
}

/// Shift the frame by whole pixels, filling uncovered pixels with zero.
///
/// Positive `dx` moves content right, positive `dy` moves it down.
pub fn translate(frame: &ArrayView2<u8>, dx: i64, dy: i64) -> Array2<u8> {
    let (height, width) = frame.dim();
    let mut out = Array2::zeros((height, width));
    for ((row, col), value) in out.indexed_iter_mut() {
        let src_row = row as i64 - dy;
        let src_col = col as i64 - dx;
        if src_row >= 0 && src_col >= 0 && (src_row as usize) < height && (src_col as usize) < width
        {
            *value = frame[[src_row as usize, src_col as usize]];
        }
    }
    out
}

/// Analysis and display variants of one acquired frame
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Translated frame with everything outside the crop window zeroed
    pub analysis: Array2<u8>,
    /// Translated frame with a +20 brightness lift for the operator view
    pub display: Array2<u8>,
}

/// Brightness lift applied to the display variant
pub const DISPLAY_BRIGHTNESS_LIFT: i16 = 20;

/// Recenter the frame on `crop_center` and mask everything outside the crop.
///
/// The frame is translated so that `crop_center` (defaulting to the frame
/// center) lands on the frame center. The analysis variant keeps only a
/// `crop_w × crop_h` window around the frame center; a crop larger than the
/// frame keeps everything.
pub fn crop_translate(
    frame: &ArrayView2<u8>,
    crop_center: Option<[f64; 2]>,
    crop_w: usize,
    crop_h: usize,
) -> PreparedFrame {
    let (height, width) = frame.dim();
    let half_w = width as f64 / 2.0;
    let half_h = height as f64 / 2.0;
    let [cx, cy] = crop_center.unwrap_or([half_w, half_h]);

    let translated = translate(frame, (half_w - cx) as i64, (half_h - cy) as i64);

    let start_x = (half_w - crop_w as f64 / 2.0).max(0.0) as usize;
    let start_y = (half_h - crop_h as f64 / 2.0).max(0.0) as usize;
    let end_x = (start_x + crop_w).min(width);
    let end_y = (start_y + crop_h).min(height);

    let mut analysis = Array2::zeros((height, width));
    if start_x < end_x && start_y < end_y {
        analysis
            .slice_mut(s![start_y..end_y, start_x..end_x])
            .assign(&translated.slice(s![start_y..end_y, start_x..end_x]));
    }

    let display = brighten(&translated.view(), DISPLAY_BRIGHTNESS_LIFT);
    PreparedFrame { analysis, display }
}

/// Whole-frame intensity summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub peak: u8,
    pub mean: f64,
    /// Fraction of pixels at full scale
    pub saturated_fraction: f64,
}

pub fn frame_stats(frame: &ArrayView2<u8>) -> FrameStats {
    let count = frame.len();
    if count == 0 {
        return FrameStats {
            peak: 0,
            mean: 0.0,
            saturated_fraction: 0.0,
        };
    }
    let mut peak = 0u8;
    let mut sum = 0u64;
    let mut saturated = 0usize;
    for &v in frame.iter() {
        peak = peak.max(v);
        sum += u64::from(v);
        if v == u8::MAX {
            saturated += 1;
        }
    }
    FrameStats {
        peak,
        mean: sum as f64 / count as f64,
        saturated_fraction: saturated as f64 / count as f64,
    }
}

/// Mean intensity of a `size.0 × size.1` window centered at `center` (x, y).
///
/// The window is clipped to the frame. Returns `None` if nothing remains.
pub fn window_mean(
    frame: &ArrayView2<u8>,
    center: (f64, f64),
    size: (usize, usize),
) -> Option<f64> {
    let (height, width) = frame.dim();
    let clip = |v: f64, max: usize| -> usize { v.max(0.0).min(max as f64) as usize };

    let x0 = clip(center.0 - size.0 as f64 / 2.0, width);
    let x1 = clip(center.0 + size.0 as f64 / 2.0, width);
    let y0 = clip(center.1 - size.1 as f64 / 2.0, height);
    let y1 = clip(center.1 + size.1 as f64 / 2.0, height);

    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    let zone = frame.slice(s![y0..y1, x0..x1]);
    let sum: u64 = zone.iter().map(|&v| u64::from(v)).sum();
    Some(sum as f64 / zone.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_normalize_min_max() {
        let frame = array![[10u8, 20], [30, 60]];
        let out = normalize_min_max(&frame.view());
        assert_eq!(out[[0, 0]], 0);
        assert_eq!(out[[1, 1]], 255);
        assert_eq!(out[[0, 1]], 51);
    }

    #[test]
    fn test_normalize_constant_frame() {
        let frame = Array2::from_elem((4, 4), 77u8);
        assert!(normalize_min_max(&frame.view()).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_brighten_saturates() {
        let frame = array![[0u8, 240, 250]];
        assert_eq!(brighten(&frame.view(), 20), array![[20u8, 255, 255]]);
        assert_eq!(brighten(&frame.view(), -20), array![[0u8, 220, 230]]);
    }

    #[test]
    fn test_flip_horizontal() {
        let frame = array![[1u8, 2, 3], [4, 5, 6]];
        assert_eq!(flip_horizontal(&frame.view()), array![[3u8, 2, 1], [6, 5, 4]]);
    }

    #[test]
    fn test_translate() {
        let frame = array![[1u8, 2, 3], [4, 5, 6], [7, 8, 9]];
        let out = translate(&frame.view(), 1, -1);
        assert_eq!(out, array![[0u8, 4, 5], [0, 7, 8], [0, 0, 0]]);
    }

    #[test]
    fn test_crop_translate_default_center_masks_outside() {
        let frame = Array2::from_elem((10, 10), 100u8);
        let prepared = crop_translate(&frame.view(), None, 4, 2);

        // Window of 4x2 around (5, 5)
        assert_eq!(prepared.analysis.iter().filter(|&&v| v == 100).count(), 8);
        assert_eq!(prepared.analysis[[4, 3]], 100);
        assert_eq!(prepared.analysis[[5, 6]], 100);
        assert_eq!(prepared.analysis[[3, 3]], 0);
        assert_eq!(prepared.display[[0, 0]], 120);
    }

    #[test]
    fn test_crop_translate_moves_center() {
        let mut frame = Array2::zeros((10, 10));
        frame[[2, 7]] = 200u8;
        let prepared = crop_translate(&frame.view(), Some([7.0, 2.0]), 10, 10);
        assert_eq!(prepared.analysis[[5, 5]], 200);
    }

    #[test]
    fn test_crop_larger_than_frame() {
        let frame = Array2::from_elem((6, 8), 9u8);
        let prepared = crop_translate(&frame.view(), None, 100, 100);
        assert!(prepared.analysis.iter().all(|&v| v == 9));
    }

    #[test]
    fn test_frame_stats() {
        let frame = array![[0u8, 255], [255, 10]];
        let stats = frame_stats(&frame.view());
        assert_eq!(stats.peak, 255);
        assert_relative_eq!(stats.saturated_fraction, 0.5);
        assert_relative_eq!(stats.mean, 130.0);
    }

    #[test]
    fn test_window_mean_clipped() {
        let mut frame = Array2::zeros((10, 10));
        frame[[0, 0]] = 40u8;
        frame[[0, 1]] = 80u8;
        // Window 4x2 around (0, 0) clips to cols 0..2, rows 0..1
        let mean = window_mean(&frame.view(), (0.0, 0.0), (4, 2)).unwrap();
        assert_relative_eq!(mean, 60.0);
    }

    #[test]
    fn test_window_mean_outside() {
        let frame = Array2::<u8>::zeros((10, 10));
        assert!(window_mean(&frame.view(), (50.0, 50.0), (4, 4)).is_none());
    }
}

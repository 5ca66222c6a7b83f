//! High-beam hotspot location

use ndarray::ArrayView2;
use shared::image_proc::{nonzero_moments, normalize_min_max};

use crate::error::DetectionError;

/// Center of mass of the pixels at or above `threshold` after stretching
/// the frame to the full 8-bit range.
///
/// # Errors
/// [`DetectionError::CentroidUndefined`] when no pixel reaches the threshold.
pub fn locate_hotspot(frame: &ArrayView2<u8>, threshold: u8) -> Result<(f64, f64), DetectionError> {
    let mut stretched = normalize_min_max(frame);
    stretched.mapv_inplace(|v| if v < threshold { 0 } else { v });

    nonzero_moments(&stretched.view())
        .centroid()
        .ok_or(DetectionError::CentroidUndefined)
}

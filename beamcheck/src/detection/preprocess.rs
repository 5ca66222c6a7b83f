//! Frame to contour: blur, binarize, clear the border, trace the largest region

use ndarray::ArrayView2;
use shared::image_proc::{gaussian_blur, largest_contour, threshold_binary, zero_border, Contour};

use crate::config::DetectionParams;
use crate::error::DetectionError;

/// Outer boundary of the brightest connected region of the beam.
///
/// # Errors
/// [`DetectionError::NoContourFound`] when nothing survives thresholding.
pub fn extract_contour(
    frame: &ArrayView2<u8>,
    params: &DetectionParams,
) -> Result<Contour, DetectionError> {
    let blurred = gaussian_blur(frame, params.blur_ksize, 0.0);
    let mut mask = threshold_binary(&blurred.view(), params.binary_threshold);
    zero_border(&mut mask, params.border_margin);

    largest_contour(&mask.view())
        .filter(|c| !c.is_empty())
        .ok_or(DetectionError::NoContourFound)
}

//! Image processing primitives for headlight beam analysis.
//!
//! # Module Organization
//!
//! - **image**: Format conversion, normalization, flips and the crop/translate step
//! - **filter**: Separable Gaussian smoothing
//! - **detection::thresholding**: Binary thresholding, border suppression and
//!   connected component labeling
//! - **detection::contour**: Largest-contour extraction
//! - **centroid**: Image moments of thresholded frames
//!
//! Everything operates on 8-bit single-channel `ndarray` views indexed
//! `[[row, col]]`; points handed to callers are `(x, y)` = `(col, row)`.

pub mod centroid;
pub mod detection;
pub mod filter;
pub mod image;

pub use centroid::{nonzero_moments, Moments};
pub use detection::{
    component_sizes, connected_components, largest_contour, threshold_binary,
    zero_border, Contour,
};
pub use filter::{gaussian_blur, gaussian_kernel};
pub use image::{
    brighten, crop_translate, flip_horizontal, frame_stats, luma_from_dynamic, normalize_min_max,
    window_mean, FrameStats, PreparedFrame,
};

//! Binary segmentation and contour extraction

pub mod contour;
pub mod thresholding;

pub use contour::{largest_contour, Contour};
pub use thresholding::{component_sizes, connected_components, threshold_binary, zero_border};

//! Frame source backed by an image file that an external grabber rewrites
//!
//! The capture daemon drops the newest frame at a fixed path. Each call to
//! [`FrameSource::next_frame`] decodes whatever is there now and converts it
//! to 8-bit luma. A missing or half-written file is not an error, it simply
//! means no frame is ready this tick.

use super::{CameraResult, FrameSource};
use crate::image_proc::image::luma_from_dynamic;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Default location the grabber writes to
pub const DEFAULT_FRAME_PATH: &str = "/mnt/temp/frame.jpg";

pub struct FileFrameSource {
    path: PathBuf,
    name: String,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("FileFrameSource({})", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FileFrameSource {
    fn next_frame(&mut self) -> CameraResult<Option<Array2<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        match image::open(&self.path) {
            Ok(img) => Ok(Some(luma_from_dynamic(&img))),
            Err(e) => {
                log::debug!("Frame at {} not readable yet: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_missing_file_is_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileFrameSource::new(dir.path().join("absent.png"));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_reads_grayscale_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut img = GrayImage::new(4, 3);
        img.put_pixel(2, 1, Luma([200]));
        img.save(&path).unwrap();

        let mut source = FileFrameSource::new(&path);
        let frame = source.next_frame().unwrap().unwrap();

        assert_eq!(frame.dim(), (3, 4));
        assert_eq!(frame[[1, 2]], 200);
        assert_eq!(frame[[0, 0]], 0);
    }

    #[test]
    fn test_corrupt_file_is_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let mut source = FileFrameSource::new(&path);
        assert!(source.next_frame().unwrap().is_none());
    }
}

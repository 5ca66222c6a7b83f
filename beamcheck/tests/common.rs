//! Common utilities for beamcheck tests

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Low beam light pattern: flat cutoff left of the junction, rising to the right
#[derive(Debug, Clone)]
pub struct CutoffPattern {
    /// Junction `(x, y)` in pixels
    pub junction: (f64, f64),
    /// Inner slope in image coordinates, negative rises to the right
    pub inner_slope: f64,
    /// Lit columns `left..right`
    pub left: usize,
    pub right: usize,
    /// First unlit row below the pattern
    pub bottom: usize,
    pub level: u8,
}

impl CutoffPattern {
    /// Pattern with its junction at `(x, y)` and a 60 % inner slope
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            junction: (x, y),
            inner_slope: -0.6,
            left: (x - 200.0).round() as usize,
            right: (x + 240.0).round() as usize,
            bottom: (y + 160.0).round() as usize,
            level: 50,
        }
    }

    /// Same pattern moved by `(dx, dy)` pixels
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        let shift = |v: usize, d: f64| (v as f64 + d).round() as usize;
        Self {
            junction: (self.junction.0 + dx, self.junction.1 + dy),
            left: shift(self.left, dx),
            right: shift(self.right, dx),
            bottom: shift(self.bottom, dy),
            ..self.clone()
        }
    }

    /// Cutoff row at column `x`
    pub fn cutoff(&self, x: f64) -> f64 {
        let (x0, y0) = self.junction;
        if x <= x0 {
            y0
        } else {
            y0 + self.inner_slope * (x - x0)
        }
    }

    fn is_lit(&self, row: usize, col: usize) -> bool {
        // Rows within half a pixel of the cutoff count as lit
        (self.left..self.right).contains(&col)
            && row < self.bottom
            && row as f64 >= self.cutoff(col as f64) - 0.5
    }
}

/// Configuration for synthetic frame generation
#[derive(Debug, Clone)]
pub struct SyntheticFrameConfig {
    pub width: usize,
    pub height: usize,
    /// Uniform background noise added to every pixel, `0..=noise`
    pub noise: u8,
    pub seed: u64,
}

impl Default for SyntheticFrameConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            noise: 2,
            seed: 42,
        }
    }
}

fn add_noise(frame: &mut Array2<u8>, config: &SyntheticFrameConfig) {
    if config.noise == 0 {
        return;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    for v in frame.iter_mut() {
        *v = v.saturating_add(rng.gen_range(0..=config.noise));
    }
}

/// Frame showing a low beam cutoff
pub fn create_cutoff_frame(config: &SyntheticFrameConfig, pattern: &CutoffPattern) -> Array2<u8> {
    let mut frame = Array2::from_shape_fn((config.height, config.width), |(row, col)| {
        if pattern.is_lit(row, col) {
            pattern.level
        } else {
            0
        }
    });
    add_noise(&mut frame, config);
    frame
}

/// Frame showing a flat-topped high beam hotspot
pub fn create_hotspot_frame(
    config: &SyntheticFrameConfig,
    center: (f64, f64),
    radius: f64,
    level: u8,
) -> Array2<u8> {
    let mut frame = Array2::from_shape_fn((config.height, config.width), |(row, col)| {
        let dx = col as f64 - center.0;
        let dy = row as f64 - center.1;
        if dx * dx + dy * dy <= radius * radius {
            level
        } else {
            0
        }
    });
    add_noise(&mut frame, config);
    frame
}

/// Frame with noise only
pub fn create_dark_frame(config: &SyntheticFrameConfig) -> Array2<u8> {
    let mut frame = Array2::zeros((config.height, config.width));
    add_noise(&mut frame, config);
    frame
}

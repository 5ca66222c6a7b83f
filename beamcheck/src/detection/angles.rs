//! Yaw, pitch and roll of the detected beam reference point

/// Beam orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Per-frame inputs for angle derivation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleContext {
    /// Pixels per angular unit; angles are zero without it
    pub qin: Option<f64>,
    /// Commanded vertical offset in pixels
    pub tilt_px: f64,
    /// Distance constant the offsets are measured against
    pub focal_constant: f64,
}

/// Derive orientation from a reference point.
///
/// `slope` is the outer cutoff slope for line models, `None` for the
/// centroid model. Everything is zero when `qin` is missing or zero.
pub fn derive_angles(
    point: (f64, f64),
    slope: Option<f64>,
    frame_size: (usize, usize),
    ctx: &AngleContext,
) -> Angles {
    let Some(qin) = ctx.qin.filter(|q| *q != 0.0 && q.is_finite()) else {
        return Angles::default();
    };
    let (width, height) = frame_size;
    let dx = (point.0 - width as f64 / 2.0) / qin;
    let dy = (point.1 - height as f64 / 2.0 + ctx.tilt_px) / qin;

    Angles {
        yaw: dx.atan2(ctx.focal_constant).to_degrees(),
        pitch: dy.atan2(ctx.focal_constant).to_degrees(),
        roll: slope.map(|m| m.atan().to_degrees()).unwrap_or(0.0),
    }
}

//! Tolerance window scoring of a detected point
//!
//! Each axis is scored independently. A point inside the half-extent gets
//! [`Magnitude::Ok`] on both sides of the axis. Outside it, the side the
//! beam has to move towards gets [`Magnitude::NearMiss`] up to twice the
//! half-extent and [`Magnitude::Far`] beyond; the opposite side gets
//! [`Magnitude::WrongDirection`].

use crate::commands::CommandTable;
use crate::config::ToleranceConfig;

/// Acceptance rectangle around the expected beam position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceWindow {
    pub center_x: f64,
    pub center_y: f64,
    pub half_width: f64,
    pub half_height: f64,
    /// Vertical bias of the center, in pixels (commanded tilt)
    pub vertical_offset: f64,
}

impl ToleranceWindow {
    /// Window centered on `center` with extents from the command table,
    /// falling back to `fallback` for keywords the controller has not sent.
    pub fn from_commands(center: (f64, f64), commands: &CommandTable, fallback: &ToleranceConfig) -> Self {
        let (half_width, half_height) = commands.tolerance(fallback);
        Self {
            center_x: center.0,
            center_y: center.1,
            half_width,
            half_height,
            vertical_offset: commands.tilt_px(),
        }
    }
}

/// Directional score sent to the controller as 0..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Magnitude {
    /// The beam is off towards the other side
    WrongDirection = 0,
    Far = 1,
    NearMiss = 2,
    Ok = 3,
}

impl Magnitude {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub inside: bool,
    pub left: Magnitude,
    pub right: Magnitude,
    pub up: Magnitude,
    pub down: Magnitude,
    pub status: Status,
}

/// Score an offset against a half-extent.
///
/// Returns `(towards_negative, towards_positive)`: for a negative offset the
/// positive side is scored and the negative side is the wrong direction.
fn score_axis(offset: f64, half: f64) -> (Magnitude, Magnitude) {
    let miss = |beyond_double: bool| {
        if beyond_double {
            Magnitude::Far
        } else {
            Magnitude::NearMiss
        }
    };
    if offset < -half {
        (Magnitude::WrongDirection, miss(offset < -2.0 * half))
    } else if offset > half {
        (miss(offset > 2.0 * half), Magnitude::WrongDirection)
    } else {
        (Magnitude::Ok, Magnitude::Ok)
    }
}

/// Classify `point` against `window`.
pub fn classify(point: (f64, f64), window: &ToleranceWindow) -> ClassificationResult {
    let dx = point.0 - window.center_x;
    let dy = point.1 - (window.center_y + window.vertical_offset);

    let (left, right) = score_axis(dx, window.half_width);
    let (up, down) = score_axis(dy, window.half_height);

    let worst = [left, right, up, down]
        .into_iter()
        .filter(|m| *m != Magnitude::WrongDirection)
        .min()
        .unwrap_or(Magnitude::Ok);
    let status = match worst {
        Magnitude::Ok => Status::Ok,
        Magnitude::NearMiss => Status::Warning,
        Magnitude::Far | Magnitude::WrongDirection => Status::Error,
    };

    ClassificationResult {
        inside: dx.abs() <= window.half_width && dy.abs() <= window.half_height,
        left,
        right,
        up,
        down,
        status,
    }
}

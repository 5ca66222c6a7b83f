//! Text protocol spoken with the test-bench controller
//!
//! Outbound, the station sends one measurement per cycle:
//!
//! ```text
//! x <f>; y <f>; lux <f>; roll <f>; yaw <f>; pitch <f>; left <i>; right <i>; up <i>; down <i>;
//! ```
//!
//! with positions in calibrated units, lux in the selected unit and two
//! decimals throughout, or `idle ` when nothing new was measured. Inbound,
//! the controller sends `keyword value;` clauses that are merged into the
//! [`CommandTable`].

use crate::commands::{keys, CommandTable};
use crate::config::StationConfig;

/// Longest message the controller accepts
pub const MAX_MESSAGE_LEN: usize = 278;

/// Placeholder sent when no measurement is queued
pub const IDLE_MESSAGE: &str = "idle ";

/// Prefix of the fixed-column configuration frame used by older controllers
pub const LEGACY_PREFIX: &str = "CFG->";

/// Slopes smaller than this are treated as uncalibrated
const MIN_SLOPE: f64 = 1e-9;

/// Centimeters per percent of tilt on an aiming screen 10 m from the lamp
const CM_PER_PERCENT: f64 = 10.0;

const CM_PER_INCH: f64 = 2.54;

/// Kilocandela per lux measured at 25 m.
///
/// Inverse square law, `I = E·d²`: 1 lux at 25 m is 625 cd.
const KCD_PER_LUX_25M: f64 = 25.0 * 25.0 / 1000.0;

/// Unit for reported positions (`UMI` for x, `UMH` for y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionUnit {
    #[default]
    Percent,
    Centimeters,
    Inches,
}

impl PositionUnit {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" | "cm" => PositionUnit::Centimeters,
            "2" | "in" | "inch" => PositionUnit::Inches,
            _ => PositionUnit::Percent,
        }
    }

    pub fn from_percent(self, percent: f64) -> f64 {
        match self {
            PositionUnit::Percent => percent,
            PositionUnit::Centimeters => percent * CM_PER_PERCENT,
            PositionUnit::Inches => percent * CM_PER_PERCENT / CM_PER_INCH,
        }
    }
}

/// Unit for reported luminous intensity (`UMB`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LuxUnit {
    /// Illuminance at 25 m
    #[default]
    Lux25m,
    /// Luminous intensity in kilocandela
    KilocandelaAt1m,
    /// Illuminance at 1 m in kilolux
    KiloluxAt1m,
}

impl LuxUnit {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" | "kcd" => LuxUnit::KilocandelaAt1m,
            "2" | "klux" => LuxUnit::KiloluxAt1m,
            _ => LuxUnit::Lux25m,
        }
    }

    /// Convert a reading in lux at 25 m to this unit
    pub fn from_lux_25m(self, lux: f64) -> f64 {
        match self {
            LuxUnit::Lux25m => lux,
            // E·d² gives candela; at 1 m lux and candela coincide numerically
            LuxUnit::KilocandelaAt1m | LuxUnit::KiloluxAt1m => lux * KCD_PER_LUX_25M,
        }
    }
}

/// One frame's outbound record, still in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Detected point `(x, y)` in frame pixels
    pub point: Option<(f64, f64)>,
    /// Calibrated lux at 25 m
    pub lux: f64,
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub left: u8,
    pub right: u8,
    pub up: u8,
    pub down: u8,
}

/// Calibration and unit selection applied while encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeContext {
    pub frame_center: (f64, f64),
    /// Pixels per percent of tilt
    pub y_calib_m: f64,
    /// Commanded vertical offset in pixels
    pub tilt_px: f64,
    pub x_unit: PositionUnit,
    pub y_unit: PositionUnit,
    pub lux_unit: LuxUnit,
}

impl EncodeContext {
    pub fn new(config: &StationConfig, commands: &CommandTable) -> Self {
        Self {
            frame_center: config.frame_center(),
            y_calib_m: config.calibration.y_calib_m,
            tilt_px: commands.tilt_px(),
            x_unit: commands.x_unit(),
            y_unit: commands.y_unit(),
            lux_unit: commands.lux_unit(),
        }
    }

    /// Pixel point to calibrated `(x, y)`.
    ///
    /// Positions are relative to the tilted tolerance center. Without a
    /// calibration slope the pixel offsets are reported unchanged.
    pub fn calibrated_position(&self, point: (f64, f64)) -> (f64, f64) {
        let dx = point.0 - self.frame_center.0;
        let dy = point.1 - (self.frame_center.1 + self.tilt_px);
        if self.y_calib_m.abs() < MIN_SLOPE {
            return (dx, dy);
        }
        let x_pct = dx / self.y_calib_m.abs();
        let y_pct = dy / self.y_calib_m;
        (self.x_unit.from_percent(x_pct), self.y_unit.from_percent(y_pct))
    }
}

/// Cut `message` to at most `max_len` bytes on a character boundary.
pub fn truncate_message(mut message: String, max_len: usize) -> String {
    if message.len() > max_len {
        let mut cut = max_len;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}

/// Format a measurement for the controller.
pub fn encode_measurement(measurement: &Measurement, ctx: &EncodeContext) -> String {
    let (x, y) = measurement
        .point
        .map(|p| ctx.calibrated_position(p))
        .unwrap_or((0.0, 0.0));
    let lux = ctx.lux_unit.from_lux_25m(measurement.lux);

    let message = format!(
        "x {x:.2}; y {y:.2}; lux {lux:.2}; roll {:.2}; yaw {:.2}; pitch {:.2}; left {}; right {}; up {}; down {};",
        measurement.roll,
        measurement.yaw,
        measurement.pitch,
        measurement.left,
        measurement.right,
        measurement.up,
        measurement.down,
    );
    truncate_message(message, MAX_MESSAGE_LEN)
}

/// Encode the queued measurement, or the idle placeholder when none is queued.
pub fn encode_outbound(measurement: Option<&Measurement>, ctx: &EncodeContext) -> String {
    match measurement {
        Some(m) => encode_measurement(m, ctx),
        None => IDLE_MESSAGE.to_string(),
    }
}

/// Split a message into `(keyword, value)` clauses.
///
/// Clauses are separated by `;` and split on their first space. Clauses
/// without a value are skipped.
pub fn parse_clauses(message: &str) -> Vec<(String, String)> {
    message
        .split(';')
        .filter_map(|clause| {
            let clause = clause.trim();
            let (key, value) = clause.split_once(' ')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse the fixed-column `CFG->` frame into clauses.
///
/// Fields that do not parse are left out.
pub fn parse_legacy_frame(message: &str) -> Vec<(String, String)> {
    let Some(body) = message.strip_prefix(LEGACY_PREFIX) else {
        return Vec::new();
    };
    // Offsets relative to the start of the whole frame
    let offset = LEGACY_PREFIX.len();
    let field = |start: usize, end: usize| -> Option<&str> {
        body.get(start - offset..end - offset).map(str::trim)
    };

    let mut clauses = Vec::new();
    let mut push_int = |key: &str, raw: Option<&str>| {
        if let Some(v) = raw.and_then(|s| s.parse::<i64>().ok()) {
            clauses.push((key.to_string(), v.to_string()));
        }
    };
    push_int(keys::PATTERN, field(5, 6));
    push_int(keys::CROSS, field(6, 7));
    push_int(keys::TOV, field(10, 13));
    push_int(keys::TILT, field(27, 31));
    push_int(keys::TOH, field(34, 37));
    if let Some(v) = field(40, 45).and_then(|s| s.parse::<f64>().ok()) {
        clauses.push((keys::QIN.to_string(), v.to_string()));
    }
    clauses
}

/// Merge an inbound message into the command table.
///
/// Later clauses win over earlier ones. A tilt given in percent also
/// rewrites the pixel tilt entry using `y_calib_m`. Returns the number of
/// clauses applied.
pub fn decode_commands(message: &str, table: &mut CommandTable, y_calib_m: f64) -> usize {
    let clauses = if message.trim_start().starts_with(LEGACY_PREFIX) {
        parse_legacy_frame(message.trim_start())
    } else {
        parse_clauses(message)
    };

    for (key, value) in &clauses {
        if key == keys::TILT || key == keys::TILT_LONG {
            match value.parse::<f64>() {
                Ok(percent) => table.set(keys::TILT_PX, format!("{}", percent * y_calib_m)),
                Err(_) => log::warn!("Ignoring non-numeric tilt '{value}'"),
            }
        }
        table.set(key.as_str(), value.as_str());
    }
    clauses.len()
}

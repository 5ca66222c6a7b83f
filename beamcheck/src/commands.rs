//! Keyword table written by the controller link
//!
//! The controller sends `keyword value` clauses; the latest value per keyword
//! lives here as a raw string. Typed accessors parse on read and fall back to
//! a documented default, so a malformed value never stops the frame loop.

use std::collections::BTreeMap;

use crate::config::ToleranceConfig;
use crate::detection::BeamKind;
use crate::protocol::{LuxUnit, PositionUnit};

/// Keywords understood by the station
pub mod keys {
    pub const RUN: &str = "run";
    pub const PATTERN: &str = "pattern";
    pub const CROSS: &str = "croce";
    pub const BEAM_TYPE: &str = "tipo_faro";
    pub const TOH: &str = "TOH";
    pub const TOV: &str = "TOV";
    /// Tilt in percent, short form
    pub const TILT: &str = "incl";
    /// Tilt in percent, long form
    pub const TILT_LONG: &str = "inclinazione";
    /// Tilt converted to pixels; written by the decoder, never by the wire
    pub const TILT_PX: &str = "incl_px";
    pub const ROTATION: &str = "rot";
    pub const POSITION: &str = "pos";
    pub const UNIT_X: &str = "UMI";
    pub const UNIT_Y: &str = "UMH";
    pub const UNIT_LUX: &str = "UMB";
    pub const NOMINAL_LUX: &str = "luxnom";
    pub const QIN: &str = "qin";
}

/// Value of `tipo_faro` selecting the calibration workflow
pub const CALIBRATION_BEAM_TYPE: &str = "calibrazione";

/// What the beam type keyword asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeamSelector {
    Measure(BeamKind),
    Calibration,
    Unknown(String),
}

impl BeamSelector {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == CALIBRATION_BEAM_TYPE {
            return BeamSelector::Calibration;
        }
        match BeamKind::from_beam_type(value) {
            Some(kind) => BeamSelector::Measure(kind),
            None => BeamSelector::Unknown(value.to_string()),
        }
    }
}

/// Mounting of the camera relative to the headlight (`pos`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    #[default]
    Normal,
    /// Frame is mirrored left to right before analysis
    Mirrored,
    /// Low beam is measured with the single-line model
    ForcedOneSegment,
}

impl PositionMode {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => PositionMode::Mirrored,
            "2" => PositionMode::ForcedOneSegment,
            _ => PositionMode::Normal,
        }
    }
}

/// How the operator view should present a frame.
///
/// Measurement never depends on these; they only steer the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFlags {
    /// `run`: overlays and readouts are shown
    pub visible: bool,
    /// `croce`: draw the tolerance cross
    pub cross: bool,
    /// `rot`: display turned by 180 degrees
    pub rotated: bool,
    /// `pattern`: display mode selector, `"0"` when unset
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTable {
    entries: BTreeMap<String, String>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse an entry as a number
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::trim) {
            Some("1") => true,
            Some(_) => false,
            None => default,
        }
    }

    /// Whether the operator view shows the measurement; on by default
    pub fn is_running(&self) -> bool {
        self.flag(keys::RUN, true)
    }

    pub fn cross_visible(&self) -> bool {
        self.flag(keys::CROSS, false)
    }

    pub fn rotated(&self) -> bool {
        self.flag(keys::ROTATION, false)
    }

    pub fn pattern(&self) -> &str {
        self.get(keys::PATTERN).map(str::trim).unwrap_or("0")
    }

    pub fn view_flags(&self) -> ViewFlags {
        ViewFlags {
            visible: self.is_running(),
            cross: self.cross_visible(),
            rotated: self.rotated(),
            pattern: self.pattern().to_string(),
        }
    }

    /// Beam type selector; low beam when unset
    pub fn beam_selector(&self) -> BeamSelector {
        match self.get(keys::BEAM_TYPE) {
            Some(value) => BeamSelector::parse(value),
            None => BeamSelector::Measure(BeamKind::TwoSegment),
        }
    }

    pub fn position_mode(&self) -> PositionMode {
        self.get(keys::POSITION)
            .map(PositionMode::from_code)
            .unwrap_or_default()
    }

    /// Tolerance half-extents `(half_width, half_height)` in pixels
    pub fn tolerance(&self, fallback: &ToleranceConfig) -> (f64, f64) {
        (
            self.number(keys::TOH).unwrap_or(fallback.toh),
            self.number(keys::TOV).unwrap_or(fallback.tov),
        )
    }

    /// Vertical bias of the tolerance center in pixels
    pub fn tilt_px(&self) -> f64 {
        self.number(keys::TILT_PX).unwrap_or(0.0)
    }

    /// Pixels-per-unit constant for angles; `None` when unset or zero
    pub fn qin(&self) -> Option<f64> {
        self.number(keys::QIN).filter(|q| *q != 0.0)
    }

    pub fn nominal_lux(&self) -> Option<f64> {
        self.number(keys::NOMINAL_LUX)
    }

    pub fn x_unit(&self) -> PositionUnit {
        self.get(keys::UNIT_X)
            .map(PositionUnit::from_code)
            .unwrap_or_default()
    }

    pub fn y_unit(&self) -> PositionUnit {
        self.get(keys::UNIT_Y)
            .map(PositionUnit::from_code)
            .unwrap_or_default()
    }

    pub fn lux_unit(&self) -> LuxUnit {
        self.get(keys::UNIT_LUX)
            .map(LuxUnit::from_code)
            .unwrap_or_default()
    }
}

//! Interactive calibration workflow
//!
//! A forward-only sequence of steps derives the constants the measurement
//! pipeline depends on: the crop center, the pixels-per-percent tilt slope
//! and one lux line per beam family. Steps advance on an operator click or
//! when autoexposure reports convergence:
//!
//! ```text
//! 1  dark reference      click     store px_lux_dark
//! 20 low beam on         click
//! 21 low beam settle     converge
//! 22 crop center         click     store crop_center, save and reload
//! 30 high beam on        click
//! 31 high beam settle    converge  store px_lux_bright_abb
//! 40 tilt to -4 %        click
//! 41 tilt settle         converge  solve slope and lux lines, save and reload
//! 100 complete
//! ```
//!
//! A terminate region in the bottom-right corner of the frame is checked on
//! every click before the step sees it.

use std::collections::BTreeSet;

use crate::autoexposure::ExposureMode;
use crate::detection::BeamKind;
use crate::error::CalibrationError;
use crate::live::LiveConfig;
use crate::luminosity::LuxLine;
use crate::store::ConfigPersistence;

/// Commanded tilt of the reference step, in percent
pub const KNOWN_TILT_PERCENT: f64 = -4.0;

/// Smallest usable tilt slope in pixels per percent
pub const MIN_SLOPE: f64 = 0.1;

const TERMINATE_WIDTH: f64 = 120.0;
const TERMINATE_HEIGHT: f64 = 35.0;
const TERMINATE_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalibrationStep {
    DarkReference,
    LowBeamOn,
    LowBeamSettle,
    CropCenter,
    HighBeamOn,
    HighBeamSettle,
    TiltReference,
    TiltSettle,
    Complete,
}

/// What the frame loop runs while a step is current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDirective {
    pub kind: BeamKind,
    pub exposure: ExposureMode,
}

impl CalibrationStep {
    pub const SEQUENCE: [CalibrationStep; 9] = [
        CalibrationStep::DarkReference,
        CalibrationStep::LowBeamOn,
        CalibrationStep::LowBeamSettle,
        CalibrationStep::CropCenter,
        CalibrationStep::HighBeamOn,
        CalibrationStep::HighBeamSettle,
        CalibrationStep::TiltReference,
        CalibrationStep::TiltSettle,
        CalibrationStep::Complete,
    ];

    /// Step number shown to the operator
    pub fn code(self) -> u8 {
        match self {
            CalibrationStep::DarkReference => 1,
            CalibrationStep::LowBeamOn => 20,
            CalibrationStep::LowBeamSettle => 21,
            CalibrationStep::CropCenter => 22,
            CalibrationStep::HighBeamOn => 30,
            CalibrationStep::HighBeamSettle => 31,
            CalibrationStep::TiltReference => 40,
            CalibrationStep::TiltSettle => 41,
            CalibrationStep::Complete => 100,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::SEQUENCE.iter().position(|s| *s == self).unwrap_or(0);
        Self::SEQUENCE
            .get(index + 1)
            .copied()
            .unwrap_or(CalibrationStep::Complete)
    }

    /// Steps that advance on their own once exposure has settled
    pub fn waits_for_convergence(self) -> bool {
        matches!(
            self,
            CalibrationStep::LowBeamSettle | CalibrationStep::HighBeamSettle | CalibrationStep::TiltSettle
        )
    }

    pub fn directive(self) -> StepDirective {
        let kind = match self {
            CalibrationStep::HighBeamOn | CalibrationStep::HighBeamSettle => BeamKind::Centroid,
            _ => BeamKind::TwoSegment,
        };
        let exposure = match self {
            CalibrationStep::DarkReference => ExposureMode::Fixed,
            _ => ExposureMode::Closed,
        };
        StepDirective { kind, exposure }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            CalibrationStep::DarkReference => "Switch the headlight off and click anywhere",
            CalibrationStep::LowBeamOn => "Switch the low beam on at tilt 0 and click anywhere",
            CalibrationStep::LowBeamSettle
            | CalibrationStep::HighBeamSettle
            | CalibrationStep::TiltSettle => "Waiting for exposure to settle",
            CalibrationStep::CropCenter => "Click the beam center",
            CalibrationStep::HighBeamOn => "Switch the high beam on at tilt 0 and click anywhere",
            CalibrationStep::TiltReference => "Set the low beam to -4% tilt and click anywhere",
            CalibrationStep::Complete => "Calibration complete",
        }
    }
}

impl std::fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Axis-aligned rectangle, edges inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, point: (f64, f64)) -> bool {
        point.0 >= self.x
            && point.0 <= self.x + self.width
            && point.1 >= self.y
            && point.1 <= self.y + self.height
    }
}

/// Terminate control in the bottom-right corner of a `width × height` frame
pub fn terminate_region(width: usize, height: usize) -> Rect {
    Rect {
        x: width as f64 - TERMINATE_WIDTH - TERMINATE_MARGIN,
        y: height as f64 - TERMINATE_HEIGHT - TERMINATE_MARGIN,
        width: TERMINATE_WIDTH,
        height: TERMINATE_HEIGHT,
    }
}

/// Values collected during a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRecord {
    pub crop_center: Option<[f64; 2]>,
    pub px_lux_dark: Option<f64>,
    pub px_lux_bright: Option<f64>,
    pub px_lux_bright_abb: Option<f64>,
    /// Pixels per percent of tilt
    pub y_calib_m: Option<f64>,
    pub low_beam_line: Option<LuxLine>,
    pub high_beam_line: Option<LuxLine>,
}

/// Per-frame measurements the workflow consumes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationInputs {
    /// Autoexposure convergence this frame
    pub converged: bool,
    /// Pixel luminosity this frame
    pub px_lux: f64,
    /// Detected point this frame
    pub point: Option<(f64, f64)>,
    /// Target lux from the controller
    pub nominal_lux: Option<f64>,
}

/// Workflow inputs, one per frame or click
#[derive(Debug, Clone, Copy)]
pub enum CalibrationEvent {
    Click(f64, f64),
    Frame,
}

/// What an event did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Ignored,
    Advanced(CalibrationStep),
    /// Step held; the operator has to retry
    Held,
    Terminated,
}

/// Calibration state machine
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    step: CalibrationStep,
    completed: BTreeSet<CalibrationStep>,
    active: bool,
    record: CalibrationRecord,
    exposure_reset_pending: bool,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self {
            step: CalibrationStep::DarkReference,
            completed: BTreeSet::new(),
            active: false,
            record: CalibrationRecord::default(),
            exposure_reset_pending: false,
        }
    }
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    pub fn completed(&self) -> &BTreeSet<CalibrationStep> {
        &self.completed
    }

    pub fn record(&self) -> &CalibrationRecord {
        &self.record
    }

    /// Detection model and exposure mode for the current step
    pub fn directive(&self) -> Option<StepDirective> {
        self.active.then(|| self.step.directive())
    }

    /// Whether autoexposure must restart; true once per settle step entered
    pub fn take_exposure_reset(&mut self) -> bool {
        std::mem::take(&mut self.exposure_reset_pending)
    }

    /// Enter the workflow from the calibration snapshot.
    pub fn start(&mut self, live: &LiveConfig, store: &dyn ConfigPersistence) {
        match store.load_default() {
            Ok(config) => live.replace_config(config),
            Err(e) => log::error!("Could not load calibration defaults, keeping current config: {e}"),
        }
        *self = Self {
            active: true,
            ..Self::default()
        };
        log::info!("Calibration started at step {}", self.step);
    }

    /// Persist, reload and leave the workflow.
    pub fn terminate(&mut self, live: &LiveConfig, store: &dyn ConfigPersistence) {
        if !self.active {
            return;
        }
        if let Err(e) = persist_and_reload(live, store) {
            log::error!("{e}");
        }
        *self = Self::default();
        log::info!("Calibration ended");
    }

    /// Feed a click or a frame through the workflow.
    pub fn handle(
        &mut self,
        event: CalibrationEvent,
        inputs: &CalibrationInputs,
        live: &LiveConfig,
        store: &dyn ConfigPersistence,
    ) -> CalibrationOutcome {
        if !self.active {
            return CalibrationOutcome::Ignored;
        }
        match event {
            CalibrationEvent::Click(x, y) => self.on_click((x, y), inputs, live, store),
            CalibrationEvent::Frame => self.on_frame(inputs, live, store),
        }
    }

    fn on_click(
        &mut self,
        point: (f64, f64),
        inputs: &CalibrationInputs,
        live: &LiveConfig,
        store: &dyn ConfigPersistence,
    ) -> CalibrationOutcome {
        let (width, height) = live.read(|s| (s.config.geometry.width, s.config.geometry.height));
        if terminate_region(width, height).contains(point) {
            log::info!("Terminate requested at step {}", self.step);
            self.terminate(live, store);
            return CalibrationOutcome::Terminated;
        }

        match self.step {
            CalibrationStep::DarkReference => {
                let dark = inputs.px_lux;
                self.record.px_lux_dark = Some(dark);
                live.update_config(|c| c.calibration.px_lux_dark = dark);
                log::info!("Dark reference px_lux {dark:.3}");
            }
            CalibrationStep::LowBeamOn | CalibrationStep::HighBeamOn | CalibrationStep::TiltReference => {}
            CalibrationStep::CropCenter => {
                let center = [point.0, point.1];
                self.record.crop_center = Some(center);
                live.update_config(|c| c.geometry.crop_center = Some(center));
                log::info!("Crop center set to ({:.0}, {:.0})", point.0, point.1);
                if let Err(e) = persist_and_reload(live, store) {
                    log::error!("{e}");
                }
            }
            _ => return CalibrationOutcome::Ignored,
        }
        self.advance()
    }

    fn on_frame(
        &mut self,
        inputs: &CalibrationInputs,
        live: &LiveConfig,
        store: &dyn ConfigPersistence,
    ) -> CalibrationOutcome {
        if !self.step.waits_for_convergence() || !inputs.converged {
            return CalibrationOutcome::Ignored;
        }
        match self.step {
            CalibrationStep::HighBeamSettle => {
                let bright = inputs.px_lux;
                self.record.px_lux_bright_abb = Some(bright);
                live.update_config(|c| c.calibration.px_lux_bright_abb = bright);
                log::info!("High beam px_lux {bright:.3}");
            }
            CalibrationStep::TiltSettle => {
                if let Err(e) = self.complete(inputs, live, store) {
                    log::error!("Calibration held at step {}: {e}", self.step);
                    return CalibrationOutcome::Held;
                }
            }
            _ => {}
        }
        self.advance()
    }

    /// Solve the slope and the lux lines from the collected readings.
    fn complete(
        &mut self,
        inputs: &CalibrationInputs,
        live: &LiveConfig,
        store: &dyn ConfigPersistence,
    ) -> Result<(), CalibrationError> {
        let point = inputs.point.ok_or(CalibrationError::NoReferencePoint)?;
        let height = live.read(|s| s.config.geometry.height);
        let slope = tilt_slope(point.1, height)?;

        let bright = inputs.px_lux;
        let nominal = inputs.nominal_lux.unwrap_or(0.0);
        self.record.y_calib_m = Some(slope);
        self.record.px_lux_bright = Some(bright);
        log::info!("Tilt slope {slope:.3} px/%");

        let constants = live.read(|s| s.config.calibration.clone());
        let low = LuxLine::solve(constants.px_lux_dark, bright, nominal);
        let high = LuxLine::solve(constants.px_lux_dark, constants.px_lux_bright_abb, nominal);
        for (name, line) in [("low beam", &low), ("high beam", &high)] {
            match line {
                Ok(l) => log::info!("{name} lux line m={:.4} q={:.4}", l.m, l.q),
                Err(e) => log::warn!("Skipping {name} lux calibration: {e}"),
            }
        }
        self.record.low_beam_line = low.as_ref().ok().copied();
        self.record.high_beam_line = high.as_ref().ok().copied();

        live.update_config(|c| {
            let cal = &mut c.calibration;
            cal.y_calib_m = slope;
            cal.px_lux_bright = bright;
            if let Ok(l) = low {
                cal.lux_m = l.m;
                cal.lux_q = l.q;
            }
            if let Ok(l) = high {
                cal.lux_m_abb = l.m;
                cal.lux_q_abb = l.q;
            }
        });
        if let Err(e) = persist_and_reload(live, store) {
            log::error!("{e}");
        }
        Ok(())
    }

    fn advance(&mut self) -> CalibrationOutcome {
        self.completed.insert(self.step);
        self.step = self.step.next();
        if self.step.waits_for_convergence() {
            self.exposure_reset_pending = true;
        }
        log::info!("Calibration advanced to step {}", self.step);
        CalibrationOutcome::Advanced(self.step)
    }
}

/// Pixels per percent from the row of the beam at the known tilt.
///
/// # Errors
/// [`CalibrationError::SlopeTooSmall`] when the beam barely moved.
pub fn tilt_slope(detected_y: f64, frame_height: usize) -> Result<f64, CalibrationError> {
    let slope = (detected_y - frame_height as f64 / 2.0) / KNOWN_TILT_PERCENT;
    if slope.abs() < MIN_SLOPE {
        return Err(CalibrationError::SlopeTooSmall {
            slope,
            minimum: MIN_SLOPE,
        });
    }
    Ok(slope)
}

/// Write the live configuration as the nominal document and read it back.
///
/// Both happen under the live lock, so no decode can slip in between.
pub fn persist_and_reload(live: &LiveConfig, store: &dyn ConfigPersistence) -> Result<(), CalibrationError> {
    live.write(|state| {
        store
            .save_nominal(&state.config)
            .map_err(|e| CalibrationError::Persist(e.to_string()))?;
        state.config = store
            .load_nominal()
            .map_err(|e| CalibrationError::Persist(e.to_string()))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;
    use crate::error::StoreError;
    use crate::store::{validated, DEFAULT_CONFIG, NOMINAL_CONFIG};
    use shared::config_storage::ConfigStorageError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory documents
    #[derive(Default)]
    struct MemoryStore {
        nominal: Mutex<Option<StationConfig>>,
        default: Option<StationConfig>,
        saves: Mutex<usize>,
    }

    impl ConfigPersistence for MemoryStore {
        fn load_nominal(&self) -> Result<StationConfig, StoreError> {
            let config = self
                .nominal
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ConfigStorageError::NotFound(PathBuf::from(NOMINAL_CONFIG)))?;
            validated(NOMINAL_CONFIG, config)
        }

        fn load_default(&self) -> Result<StationConfig, StoreError> {
            validated(DEFAULT_CONFIG, self.default.clone().unwrap_or_default())
        }

        fn save_nominal(&self, config: &StationConfig) -> Result<(), StoreError> {
            *self.nominal.lock().unwrap() = Some(config.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn started() -> (CalibrationSession, LiveConfig, MemoryStore) {
        let store = MemoryStore::default();
        let live = LiveConfig::new(StationConfig::default());
        let mut session = CalibrationSession::new();
        session.start(&live, &store);
        (session, live, store)
    }

    fn frame(converged: bool, px_lux: f64, point: Option<(f64, f64)>) -> CalibrationInputs {
        CalibrationInputs {
            converged,
            px_lux,
            point,
            nominal_lux: Some(40.0),
        }
    }

    #[test]
    fn test_step_sequence() {
        let codes: Vec<u8> = CalibrationStep::SEQUENCE.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![1, 20, 21, 22, 30, 31, 40, 41, 100]);
        assert_eq!(CalibrationStep::Complete.next(), CalibrationStep::Complete);
    }

    #[test]
    fn test_directives() {
        assert_eq!(
            CalibrationStep::DarkReference.directive().exposure,
            ExposureMode::Fixed
        );
        assert_eq!(CalibrationStep::HighBeamSettle.directive().kind, BeamKind::Centroid);
        assert_eq!(CalibrationStep::TiltSettle.directive().kind, BeamKind::TwoSegment);
    }

    #[test]
    fn test_terminate_region() {
        let r = terminate_region(640, 480);
        assert_eq!(r, Rect { x: 510.0, y: 435.0, width: 120.0, height: 35.0 });
        assert!(r.contains((630.0, 470.0)));
        assert!(!r.contains((509.0, 450.0)));
    }

    #[test]
    fn test_inactive_session_ignores_events() {
        let store = MemoryStore::default();
        let live = LiveConfig::new(StationConfig::default());
        let mut session = CalibrationSession::new();

        let outcome = session.handle(CalibrationEvent::Click(10.0, 10.0), &frame(true, 1.0, None), &live, &store);
        assert_eq!(outcome, CalibrationOutcome::Ignored);
        assert_eq!(session.directive(), None);
    }

    #[test]
    fn test_invalid_default_keeps_current_config() {
        let mut bad = StationConfig::default();
        bad.autoexposure.enabled = true;
        bad.autoexposure.exp_min = 5000.0;
        bad.autoexposure.exp_max = 100.0;
        let store = MemoryStore {
            default: Some(bad),
            ..MemoryStore::default()
        };
        let live = LiveConfig::new(StationConfig::default());
        let mut session = CalibrationSession::new();

        session.start(&live, &store);

        assert!(session.is_active());
        assert_eq!(live.config(), StationConfig::default());
    }

    #[test]
    fn test_settle_steps_wait_for_convergence() {
        let (mut session, live, store) = started();
        let idle = frame(false, 0.0, None);

        session.handle(CalibrationEvent::Click(5.0, 5.0), &idle, &live, &store);
        session.handle(CalibrationEvent::Click(5.0, 5.0), &idle, &live, &store);
        assert_eq!(session.step(), CalibrationStep::LowBeamSettle);
        assert!(session.take_exposure_reset());
        assert!(!session.take_exposure_reset());

        // Clicks do nothing while waiting
        let outcome = session.handle(CalibrationEvent::Click(5.0, 5.0), &idle, &live, &store);
        assert_eq!(outcome, CalibrationOutcome::Ignored);
        session.handle(CalibrationEvent::Frame, &idle, &live, &store);
        assert_eq!(session.step(), CalibrationStep::LowBeamSettle);

        let outcome = session.handle(CalibrationEvent::Frame, &frame(true, 0.0, None), &live, &store);
        assert_eq!(outcome, CalibrationOutcome::Advanced(CalibrationStep::CropCenter));
    }

    #[test]
    fn test_crop_center_click_persists() {
        let (mut session, live, store) = started();
        let idle = frame(false, 0.0, None);
        session.handle(CalibrationEvent::Click(0.0, 0.0), &idle, &live, &store);
        session.handle(CalibrationEvent::Click(0.0, 0.0), &idle, &live, &store);
        session.handle(CalibrationEvent::Frame, &frame(true, 0.0, None), &live, &store);

        session.handle(CalibrationEvent::Click(300.0, 250.0), &idle, &live, &store);

        assert_eq!(live.config().geometry.crop_center, Some([300.0, 250.0]));
        assert_eq!(store.load_nominal().unwrap().geometry.crop_center, Some([300.0, 250.0]));
        assert_eq!(session.step(), CalibrationStep::HighBeamOn);
    }

    #[test]
    fn test_terminate_click_wins_over_step() {
        let (mut session, live, store) = started();
        let outcome = session.handle(
            CalibrationEvent::Click(600.0, 460.0),
            &frame(false, 3.0, None),
            &live,
            &store,
        );

        assert_eq!(outcome, CalibrationOutcome::Terminated);
        assert!(!session.is_active());
        // Dark reference was not taken
        assert_eq!(live.config().calibration.px_lux_dark, 0.0);
        assert_eq!(*store.saves.lock().unwrap(), 1);
    }

    #[test]
    fn test_tilt_slope() {
        assert_eq!(tilt_slope(280.0, 480), Ok(-10.0));
        assert!(matches!(
            tilt_slope(240.0, 480),
            Err(CalibrationError::SlopeTooSmall { .. })
        ));
    }

    fn run_to_tilt_settle(session: &mut CalibrationSession, live: &LiveConfig, store: &MemoryStore) {
        let idle = frame(false, 0.0, None);
        session.handle(CalibrationEvent::Click(1.0, 1.0), &frame(false, 4.0, None), live, store);
        session.handle(CalibrationEvent::Click(1.0, 1.0), &idle, live, store);
        session.handle(CalibrationEvent::Frame, &frame(true, 0.0, None), live, store);
        session.handle(CalibrationEvent::Click(320.0, 240.0), &idle, live, store);
        session.handle(CalibrationEvent::Click(1.0, 1.0), &idle, live, store);
        session.handle(CalibrationEvent::Frame, &frame(true, 44.0, None), live, store);
        session.handle(CalibrationEvent::Click(1.0, 1.0), &idle, live, store);
        assert_eq!(session.step(), CalibrationStep::TiltSettle);
    }

    #[test]
    fn test_zero_displacement_holds_tilt_step() {
        let (mut session, live, store) = started();
        run_to_tilt_settle(&mut session, &live, &store);

        let outcome = session.handle(
            CalibrationEvent::Frame,
            &frame(true, 24.0, Some((320.0, 240.0))),
            &live,
            &store,
        );

        assert_eq!(outcome, CalibrationOutcome::Held);
        assert_eq!(session.step(), CalibrationStep::TiltSettle);
        assert_eq!(live.config().calibration.y_calib_m, 0.0);
        assert_eq!(session.record().y_calib_m, None);
    }

    #[test]
    fn test_missing_point_holds_tilt_step() {
        let (mut session, live, store) = started();
        run_to_tilt_settle(&mut session, &live, &store);

        let outcome = session.handle(CalibrationEvent::Frame, &frame(true, 24.0, None), &live, &store);
        assert_eq!(outcome, CalibrationOutcome::Held);
    }

    #[test]
    fn test_full_run_solves_constants() {
        let (mut session, live, store) = started();
        run_to_tilt_settle(&mut session, &live, &store);

        let outcome = session.handle(
            CalibrationEvent::Frame,
            &frame(true, 24.0, Some((320.0, 280.0))),
            &live,
            &store,
        );
        assert_eq!(outcome, CalibrationOutcome::Advanced(CalibrationStep::Complete));

        let cal = live.config().calibration;
        assert_eq!(cal.y_calib_m, -10.0);
        assert_eq!(cal.px_lux_dark, 4.0);
        assert_eq!(cal.px_lux_bright, 24.0);
        assert_eq!(cal.px_lux_bright_abb, 44.0);
        assert_eq!((cal.lux_m, cal.lux_q), (2.0, -8.0));
        assert_eq!((cal.lux_m_abb, cal.lux_q_abb), (1.0, -4.0));
        assert_eq!(store.load_nominal().unwrap().calibration, cal);
        assert_eq!(session.completed().len(), 8);
    }

    #[test]
    fn test_lux_line_skipped_without_nominal() {
        let (mut session, live, store) = started();
        run_to_tilt_settle(&mut session, &live, &store);

        let inputs = CalibrationInputs {
            nominal_lux: None,
            ..frame(true, 24.0, Some((320.0, 280.0)))
        };
        session.handle(CalibrationEvent::Frame, &inputs, &live, &store);

        let cal = live.config().calibration;
        assert_eq!(session.step(), CalibrationStep::Complete);
        assert_eq!(cal.y_calib_m, -10.0);
        assert_eq!((cal.lux_m, cal.lux_q), (1.0, 0.0));
    }
}

//! Autoexposure feedback controller
//!
//! Holds the brightest pixel of the frame at a target level by scaling the
//! camera exposure once per frame.
//!
//! # Operation
//! 1. Create with [`AutoExposure::new`]
//! 2. Call [`AutoExposure::update`] each frame with the frame peak
//! 3. Call [`AutoExposure::reset`] when a run starts (see [`RunTransition`])
//!
//! When the closed loop is disabled, or the caller asks for a fixed
//! exposure, convergence is reported once a warm-up delay has passed since
//! the last reset, so downstream logic never needs to know which mode is on.
//!
//! # Units
//! - Input: peak intensity, 0..=255
//! - Output: exposure in device units

use std::time::Instant;

use shared::camera_interface::DeviceControl;

use crate::config::PidParams;

/// Controller memory
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureState {
    /// Exposure currently requested
    pub setting: f64,
    pub integral: f64,
    pub previous_error: f64,
    /// When the peak last entered the stability band
    pub stable_since: Option<Instant>,
    pub converged: bool,
}

impl ExposureState {
    pub fn new(params: &PidParams) -> Self {
        Self {
            setting: params.exp_start,
            integral: 0.0,
            previous_error: 0.0,
            stable_since: None,
            converged: false,
        }
    }

    /// Restore the start exposure and clear every term and timer.
    pub fn reset(&mut self, params: &PidParams) {
        *self = Self::new(params);
    }
}

/// Outcome of one controller step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureStep {
    pub setting: f64,
    /// Normalized error `(setpoint - peak) / setpoint`
    pub error: f64,
    pub converged: bool,
}

/// Advance the controller by one frame.
///
/// Inside the deadband the setting and all terms hold still. The stability
/// timer runs independently of the deadband.
pub fn step(peak: f64, state: &mut ExposureState, params: &PidParams, now: Instant) -> ExposureStep {
    let error = (params.setpoint - peak) / params.setpoint;

    if error.abs() > params.deadband {
        state.integral = (state.integral + error).clamp(-params.integral_max, params.integral_max);
        let derivative = error - state.previous_error;
        state.previous_error = error;

        let correction = (params.kp * error + params.ki * state.integral + params.kd * derivative)
            .clamp(-params.max_correction, params.max_correction);
        state.setting = (state.setting * (1.0 + correction)).clamp(params.exp_min, params.exp_max);
    }

    if (peak - params.setpoint).abs() <= params.stable_tol {
        let since = *state.stable_since.get_or_insert(now);
        state.converged = now.saturating_duration_since(since) >= params.stable_time();
    } else {
        state.stable_since = None;
        state.converged = false;
    }

    ExposureStep {
        setting: state.setting,
        error,
        converged: state.converged,
    }
}

/// Detects the `run` keyword switching on
#[derive(Debug, Clone, Default)]
pub struct RunTransition {
    was_running: bool,
}

impl RunTransition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once per change from not running to running.
    pub fn update(&mut self, running: bool) -> bool {
        let started = running && !self.was_running;
        self.was_running = running;
        started
    }
}

/// Time-based stand-in for convergence
#[derive(Debug, Clone)]
pub struct WarmupGate {
    started: Instant,
}

impl WarmupGate {
    pub fn new(now: Instant) -> Self {
        Self { started: now }
    }

    pub fn restart(&mut self, now: Instant) {
        self.started = now;
    }

    pub fn is_open(&self, now: Instant, params: &PidParams) -> bool {
        now.saturating_duration_since(self.started) >= params.warmup()
    }
}

/// Whether this frame runs the loop or keeps the exposure fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureMode {
    #[default]
    Closed,
    Fixed,
}

/// Controller plus its device actuation
#[derive(Debug, Clone)]
pub struct AutoExposure {
    params: PidParams,
    state: ExposureState,
    warmup: WarmupGate,
    /// Last value the device accepted
    applied: Option<i64>,
}

impl AutoExposure {
    pub fn new(params: PidParams, now: Instant) -> Self {
        Self {
            state: ExposureState::new(&params),
            warmup: WarmupGate::new(now),
            params,
            applied: None,
        }
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    /// Swap gains and limits without touching the controller memory
    pub fn set_params(&mut self, params: PidParams) {
        self.params = params;
    }

    pub fn state(&self) -> &ExposureState {
        &self.state
    }

    pub fn setting(&self) -> f64 {
        self.state.setting
    }

    pub fn converged(&self) -> bool {
        self.state.converged
    }

    /// Back to the start exposure with cleared terms and timers.
    pub fn reset(&mut self, now: Instant) {
        log::info!("autoexposure reset to {}", self.params.exp_start);
        self.state.reset(&self.params);
        self.warmup.restart(now);
    }

    /// Run one frame and push a changed setting to the device.
    ///
    /// A failed device call is logged and retried on the next frame; the
    /// software state advances regardless.
    pub fn update(
        &mut self,
        peak: u8,
        mode: ExposureMode,
        device: &mut dyn DeviceControl,
        now: Instant,
    ) -> ExposureStep {
        let result = if self.params.enabled && mode == ExposureMode::Closed {
            step(f64::from(peak), &mut self.state, &self.params, now)
        } else {
            self.state.converged = self.warmup.is_open(now, &self.params);
            ExposureStep {
                setting: self.state.setting,
                error: 0.0,
                converged: self.state.converged,
            }
        };

        let value = result.setting.round() as i64;
        if self.applied != Some(value) {
            match device.set_exposure(value) {
                Ok(()) => {
                    log::debug!("exposure {value} (peak {peak}, error {:.3})", result.error);
                    self.applied = Some(value);
                }
                Err(e) => log::warn!("{}: failed to set exposure {value}: {e}", device.name()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::camera_interface::mock::MockDeviceControl;
    use shared::camera_interface::ControlType;
    use std::time::Duration;

    fn enabled() -> PidParams {
        PidParams {
            enabled: true,
            ..PidParams::default()
        }
    }

    #[test]
    fn test_correction_is_clamped() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        let out = step(0.0, &mut state, &params, Instant::now());

        assert_relative_eq!(out.setting, 390.0);
        assert_relative_eq!(state.integral, 1.0);
        assert!(!out.converged);
    }

    #[test]
    fn test_setting_respects_limits() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        state.setting = 9000.0;
        assert_eq!(step(0.0, &mut state, &params, Instant::now()).setting, 10000.0);

        state.reset(&params);
        state.setting = 51.0;
        assert_eq!(step(255.0, &mut state, &params, Instant::now()).setting, 50.0);
    }

    #[test]
    fn test_integral_anti_windup() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        let now = Instant::now();
        for _ in 0..10 {
            step(0.0, &mut state, &params, now);
        }
        assert_relative_eq!(state.integral, params.integral_max);
    }

    #[test]
    fn test_deadband_freezes_terms() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        state.integral = 0.4;
        state.previous_error = 0.1;

        let out = step(params.setpoint - 1.0, &mut state, &params, Instant::now());

        assert_eq!(out.setting, params.exp_start);
        assert_eq!(state.integral, 0.4);
        assert_eq!(state.previous_error, 0.1);
    }

    #[test]
    fn test_converges_as_peak_approaches_setpoint() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        let t0 = Instant::now();
        let mut peak = 60.0;
        let mut converged_at = None;

        for frame in 0..100u64 {
            let now = t0 + Duration::from_millis(100 * frame);
            let out = step(peak, &mut state, &params, now);
            if out.converged {
                converged_at = Some(frame);
                break;
            }
            peak += (params.setpoint - peak) * 0.3;
        }

        let frame = converged_at.expect("never converged");
        // At least stable_time worth of frames inside the band
        assert!(frame >= 15);

        state.reset(&params);
        assert!(!state.converged);
        assert_eq!(state.setting, params.exp_start);
        assert_eq!(state.stable_since, None);
    }

    #[test]
    fn test_proportional_loop_drives_linear_plant() {
        let params = PidParams {
            enabled: true,
            ki: 0.0,
            kd: 0.0,
            ..PidParams::default()
        };
        let gain = params.setpoint / 1000.0;
        let mut state = ExposureState::new(&params);
        let t0 = Instant::now();

        let mut converged = false;
        for frame in 0..200u64 {
            let peak = (gain * state.setting).min(255.0);
            let out = step(peak, &mut state, &params, t0 + Duration::from_millis(100 * frame));
            converged = out.converged;
            if converged {
                break;
            }
        }
        assert!(converged);
        assert_relative_eq!(state.setting, 1000.0, max_relative = 0.01);
    }

    #[test]
    fn test_leaving_band_clears_timer() {
        let params = enabled();
        let mut state = ExposureState::new(&params);
        let t0 = Instant::now();

        step(params.setpoint, &mut state, &params, t0);
        assert_eq!(state.stable_since, Some(t0));

        step(100.0, &mut state, &params, t0 + Duration::from_secs(2));
        assert_eq!(state.stable_since, None);
        assert!(!state.converged);
    }

    #[test]
    fn test_run_transition_fires_once() {
        let mut edge = RunTransition::new();
        assert!(edge.update(true));
        assert!(!edge.update(true));
        assert!(!edge.update(false));
        assert!(edge.update(true));
    }

    #[test]
    fn test_disabled_loop_fakes_convergence() {
        let t0 = Instant::now();
        let mut ae = AutoExposure::new(PidParams::default(), t0);
        let mut device = MockDeviceControl::new();

        let out = ae.update(10, ExposureMode::Closed, &mut device, t0 + Duration::from_millis(500));
        assert!(!out.converged);
        assert_eq!(out.setting, 300.0);

        let out = ae.update(10, ExposureMode::Closed, &mut device, t0 + Duration::from_millis(2500));
        assert!(out.converged);

        ae.reset(t0 + Duration::from_millis(2600));
        let out = ae.update(10, ExposureMode::Closed, &mut device, t0 + Duration::from_millis(3000));
        assert!(!out.converged);

        // Start value is applied once
        assert_eq!(device.values_for(ControlType::Exposure), vec![300]);
    }

    #[test]
    fn test_device_only_called_on_change_and_retried_after_failure() {
        let t0 = Instant::now();
        let mut ae = AutoExposure::new(enabled(), t0);
        let mut device = MockDeviceControl::new();
        device.fail_control(ControlType::Exposure);

        let out = ae.update(0, ExposureMode::Closed, &mut device, t0);
        assert_relative_eq!(out.setting, 390.0);
        assert!(device.values_for(ControlType::Exposure).is_empty());

        device.restore_control(ControlType::Exposure);
        let setpoint = ae.params().setpoint as u8;
        ae.update(setpoint, ExposureMode::Closed, &mut device, t0);
        ae.update(setpoint, ExposureMode::Closed, &mut device, t0);

        assert_eq!(device.values_for(ControlType::Exposure), vec![390]);
    }

    #[test]
    fn test_fixed_mode_holds_setting() {
        let t0 = Instant::now();
        let mut ae = AutoExposure::new(enabled(), t0);
        let mut device = MockDeviceControl::new();

        let out = ae.update(0, ExposureMode::Fixed, &mut device, t0);
        assert_eq!(out.setting, 300.0);
        assert_eq!(ae.state().integral, 0.0);
    }
}

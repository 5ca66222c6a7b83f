use beam_math::FitOptions;
use serde::{Deserialize, Serialize};
use shared::camera_interface::DeviceSettings;
use std::time::Duration;

use crate::error::ConfigError;

/// Frame geometry and the crop applied before analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
    /// Width of the analysis window around the frame center
    pub crop_w: usize,
    /// Height of the analysis window around the frame center
    pub crop_h: usize,
    /// Raw-frame point moved to the frame center; frame center if unset
    pub crop_center: Option<[f64; 2]>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            crop_w: 640,
            crop_h: 480,
            crop_center: None,
        }
    }
}

/// Fallback tolerance half-extents when the controller sends none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Horizontal half-width in pixels
    pub toh: f64,
    /// Vertical half-height in pixels
    pub tov: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            toh: 50.0,
            tov: 50.0,
        }
    }
}

/// Beam detection tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Gaussian kernel size for pre-blur
    pub blur_ksize: usize,
    /// Pixels strictly above this level are foreground
    pub binary_threshold: u8,
    /// Band along the frame edges cleared before contour extraction
    pub border_margin: usize,
    /// Inset applied to both ends of the fit window
    pub window_margin: f64,
    /// Iteration budget of the cutoff fit
    pub max_iterations: usize,
    /// Hotspot threshold after min-max normalization
    pub centroid_threshold: u8,
    /// Distance constant for yaw and pitch
    pub focal_constant: f64,
    /// Number of recent points to take the median over; 1 disables smoothing
    pub point_median_window: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            blur_ksize: 5,
            binary_threshold: 25,
            border_margin: 5,
            window_margin: 10.0,
            max_iterations: 100,
            centroid_threshold: 210,
            focal_constant: 25.0,
            point_median_window: 1,
        }
    }
}

impl DetectionParams {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iterations: self.max_iterations,
        }
    }
}

/// Autoexposure PID gains, limits and convergence criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidParams {
    /// Run the closed loop; when false convergence is faked after `warmup_ms`
    pub enabled: bool,
    /// Target peak intensity
    pub setpoint: f64,
    /// Normalized error band in which the loop holds still
    pub deadband: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Anti-windup clamp for the integral term
    pub integral_max: f64,
    /// Largest fractional change of the setting per frame
    pub max_correction: f64,
    pub exp_min: f64,
    pub exp_max: f64,
    /// Setting restored on reset
    pub exp_start: f64,
    /// Peak distance from the setpoint counted as stable
    pub stable_tol: f64,
    /// Dwell inside `stable_tol` before reporting convergence
    pub stable_time_ms: u64,
    /// Delay before faked convergence when the loop is disabled
    pub warmup_ms: u64,
}

impl Default for PidParams {
    fn default() -> Self {
        Self {
            enabled: false,
            setpoint: 237.0,
            deadband: 0.005,
            kp: 0.5,
            ki: 0.05,
            kd: 0.1,
            integral_max: 2.0,
            max_correction: 0.3,
            exp_min: 50.0,
            exp_max: 10000.0,
            exp_start: 300.0,
            stable_tol: 5.0,
            stable_time_ms: 1500,
            warmup_ms: 2000,
        }
    }
}

impl PidParams {
    pub fn stable_time(&self) -> Duration {
        Duration::from_millis(self.stable_time_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// Sensor response model and luminosity sampling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuminosityParams {
    /// Sensor gamma
    pub cam_g: f64,
    /// Sensor black offset
    pub cam_c: f64,
    /// Window shift in 1/160ths of the crop width
    pub lux_sft_x: f64,
    /// Window shift in 1/160ths of the crop height
    pub lux_sft_y: f64,
    pub lux_w: usize,
    pub lux_h: usize,
}

impl Default for LuminosityParams {
    fn default() -> Self {
        Self {
            cam_g: 1.0,
            cam_c: 0.0,
            lux_sft_x: 0.0,
            lux_sft_y: 0.0,
            lux_w: 10,
            lux_h: 10,
        }
    }
}

impl LuminosityParams {
    /// Window offset from the detected point in pixels
    pub fn offset(&self, crop_w: usize, crop_h: usize) -> (f64, f64) {
        (
            self.lux_sft_x * crop_w as f64 / 160.0,
            self.lux_sft_y * crop_h as f64 / 160.0,
        )
    }
}

/// Constants written by the calibration workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConstants {
    /// Pixels per percent of tilt; zero while uncalibrated
    pub y_calib_m: f64,
    pub lux_m: f64,
    pub lux_q: f64,
    pub lux_m_abb: f64,
    pub lux_q_abb: f64,
    pub px_lux_dark: f64,
    pub px_lux_bright: f64,
    pub px_lux_bright_abb: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            y_calib_m: 0.0,
            lux_m: 1.0,
            lux_q: 0.0,
            lux_m_abb: 1.0,
            lux_q_abb: 0.0,
            px_lux_dark: 0.0,
            px_lux_bright: 0.0,
            px_lux_bright_abb: 0.0,
        }
    }
}

/// Capture device selection and startup controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub camera_index: usize,
    pub brightness: i64,
    pub contrast: i64,
    pub saturation: i64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            brightness: 0,
            contrast: 32,
            saturation: 0,
        }
    }
}

/// Controller link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
    /// Minimum period of one send/receive cycle
    pub cycle_ms: u64,
    pub reply_timeout_ms: u64,
    pub reconnect_backoff_ms: u64,
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1".to_string(),
            port: 5000,
            cycle_ms: 100,
            reply_timeout_ms: 1000,
            reconnect_backoff_ms: 1000,
        }
    }
}

/// Complete station configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Verbose logging
    pub debug: bool,
    pub geometry: GeometryConfig,
    pub tolerance: ToleranceConfig,
    pub detection: DetectionParams,
    pub autoexposure: PidParams,
    pub luminosity: LuminosityParams,
    pub calibration: CalibrationConstants,
    pub device: DeviceConfig,
    pub comms: CommsConfig,
}

impl StationConfig {
    /// Frame center `(x, y)`
    pub fn frame_center(&self) -> (f64, f64) {
        (
            self.geometry.width as f64 / 2.0,
            self.geometry.height as f64 / 2.0,
        )
    }

    /// Startup device controls, using the autoexposure start value
    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            brightness: self.device.brightness,
            contrast: self.device.contrast,
            saturation: self.device.saturation,
            exposure: self.autoexposure.exp_start.round() as i64,
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.width == 0 || g.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "frame size {}x{} must be non-zero",
                g.width, g.height
            )));
        }
        if g.crop_w == 0 || g.crop_h == 0 {
            return Err(ConfigError::Invalid(format!(
                "crop size {}x{} must be non-zero",
                g.crop_w, g.crop_h
            )));
        }
        if self.tolerance.toh <= 0.0 || self.tolerance.tov <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance {}x{} must be positive",
                self.tolerance.toh, self.tolerance.tov
            )));
        }

        let d = &self.detection;
        if d.blur_ksize % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "blur kernel size {} must be odd",
                d.blur_ksize
            )));
        }
        if d.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "solver iteration budget must be positive".to_string(),
            ));
        }
        if d.focal_constant <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "focal constant {} must be positive",
                d.focal_constant
            )));
        }

        let a = &self.autoexposure;
        if a.setpoint <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "autoexposure setpoint {} must be positive",
                a.setpoint
            )));
        }
        if a.exp_min <= 0.0 || a.exp_min > a.exp_max {
            return Err(ConfigError::Invalid(format!(
                "exposure range [{}, {}] is invalid",
                a.exp_min, a.exp_max
            )));
        }
        if a.exp_start < a.exp_min || a.exp_start > a.exp_max {
            return Err(ConfigError::Invalid(format!(
                "start exposure {} outside [{}, {}]",
                a.exp_start, a.exp_min, a.exp_max
            )));
        }
        if a.integral_max < 0.0 || a.max_correction < 0.0 || a.deadband < 0.0 {
            return Err(ConfigError::Invalid(
                "autoexposure limits must be non-negative".to_string(),
            ));
        }

        let l = &self.luminosity;
        if l.cam_c >= 255.0 {
            return Err(ConfigError::Invalid(format!(
                "sensor offset {} must be below 255",
                l.cam_c
            )));
        }
        Ok(())
    }
}

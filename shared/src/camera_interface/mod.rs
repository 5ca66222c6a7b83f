//! Capture device abstraction for the beam station
//!
//! Splits the camera into the two halves the measurement loop actually uses:
//! a [`FrameSource`] that yields 8-bit grayscale frames and a
//! [`DeviceControl`] that adjusts exposure and image controls. Either half can
//! be backed by real hardware or by the mocks in [`mock`].

pub mod file_source;
pub mod mock;

use ndarray::Array2;
use std::error::Error;
use std::fmt;

/// Error type for camera operations
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Hardware communication error
    HardwareError(String),
    /// A control could not be applied
    ControlError(String),
    /// Frame capture error
    CaptureError(String),
    /// Configuration error
    ConfigError(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraError::HardwareError(msg) => write!(f, "Hardware error: {msg}"),
            CameraError::ControlError(msg) => write!(f, "Control error: {msg}"),
            CameraError::CaptureError(msg) => write!(f, "Capture error: {msg}"),
            CameraError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl Error for CameraError {}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Image controls the station adjusts on the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Exposure,
    Brightness,
    Contrast,
    Saturation,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ControlType::Exposure => "exposure",
            ControlType::Brightness => "brightness",
            ControlType::Contrast => "contrast",
            ControlType::Saturation => "saturation",
        };
        f.write_str(name)
    }
}

/// Fire-and-forget control channel to the capture device.
///
/// Calls may block briefly while the device applies the value. Callers only
/// log the outcome, so implementations should put enough context in the
/// error message to diagnose a failure from the log alone.
pub trait DeviceControl: Send {
    /// Apply a raw control value
    fn set_control(&mut self, control: ControlType, value: i64) -> CameraResult<()>;

    /// Human readable device identifier
    fn name(&self) -> &str;

    fn set_exposure(&mut self, value: i64) -> CameraResult<()> {
        self.set_control(ControlType::Exposure, value)
    }

    fn set_brightness(&mut self, value: i64) -> CameraResult<()> {
        self.set_control(ControlType::Brightness, value)
    }

    fn set_contrast(&mut self, value: i64) -> CameraResult<()> {
        self.set_control(ControlType::Contrast, value)
    }

    fn set_saturation(&mut self, value: i64) -> CameraResult<()> {
        self.set_control(ControlType::Saturation, value)
    }
}

impl DeviceControl for Box<dyn DeviceControl> {
    fn set_control(&mut self, control: ControlType, value: i64) -> CameraResult<()> {
        (**self).set_control(control, value)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Source of single-channel frames.
pub trait FrameSource: Send {
    /// Fetch the next frame.
    ///
    /// # Returns
    /// * `Ok(Some(frame))` when a frame is available
    /// * `Ok(None)` when no frame is ready yet; the caller should retry later
    /// * `Err(CameraError)` on a device failure
    fn next_frame(&mut self) -> CameraResult<Option<Array2<u8>>>;

    /// Human readable source identifier
    fn name(&self) -> &str;
}

impl FrameSource for Box<dyn FrameSource> {
    fn next_frame(&mut self) -> CameraResult<Option<Array2<u8>>> {
        (**self).next_frame()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Startup image controls for the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    pub brightness: i64,
    pub contrast: i64,
    pub saturation: i64,
    pub exposure: i64,
}

/// Apply every startup control, logging failures instead of stopping.
///
/// Returns the controls that failed, in application order.
pub fn apply_device_settings(
    device: &mut dyn DeviceControl,
    settings: &DeviceSettings,
) -> Vec<(ControlType, CameraError)> {
    let requests = [
        (ControlType::Brightness, settings.brightness),
        (ControlType::Contrast, settings.contrast),
        (ControlType::Saturation, settings.saturation),
        (ControlType::Exposure, settings.exposure),
    ];

    let mut failures = Vec::new();
    for (control, value) in requests {
        match device.set_control(control, value) {
            Ok(()) => log::info!("{}: set {control} to {value}", device.name()),
            Err(e) => {
                log::warn!("{}: failed to set {control} to {value}: {e}", device.name());
                failures.push((control, e));
            }
        }
    }
    failures
}

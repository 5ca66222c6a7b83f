//! Capture device controls for the station binary

#[cfg(feature = "v4l")]
pub mod v4l_control;

use beamcheck::config::DeviceConfig;
use shared::camera_interface::{CameraResult, ControlType, DeviceControl};
use tracing::{debug, warn};

/// Device control that only logs; used when no camera driver is built in
pub struct LoggingDeviceControl {
    name: String,
}

impl LoggingDeviceControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DeviceControl for LoggingDeviceControl {
    fn set_control(&mut self, control: ControlType, value: i64) -> CameraResult<()> {
        debug!("{}: {control} = {value} (not applied)", self.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open the configured camera's controls, falling back to logging only.
pub fn open_device(config: &DeviceConfig) -> Box<dyn DeviceControl> {
    #[cfg(feature = "v4l")]
    {
        match v4l_control::V4lDeviceControl::open(config.camera_index) {
            Ok(device) => return Box::new(device),
            Err(e) => warn!("Camera {} controls unavailable: {e}", config.camera_index),
        }
    }
    #[cfg(not(feature = "v4l"))]
    warn!(
        "Built without V4L2 support, camera {} controls are not applied",
        config.camera_index
    );

    Box::new(LoggingDeviceControl::new(format!("camera{}", config.camera_index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::camera_interface::{apply_device_settings, DeviceSettings};

    #[test]
    fn test_logging_device_accepts_everything() {
        let mut device = LoggingDeviceControl::new("test");
        let settings = DeviceSettings {
            brightness: 1,
            contrast: 2,
            saturation: 3,
            exposure: 300,
        };
        assert!(apply_device_settings(&mut device, &settings).is_empty());
        assert!(device.set_exposure(50).is_ok());
        assert_eq!(device.name(), "test");
    }
}

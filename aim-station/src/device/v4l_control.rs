//! V4L2 backed [`DeviceControl`]

use std::collections::HashMap;

use shared::camera_interface::{CameraError, CameraResult, ControlType, DeviceControl};
use v4l::prelude::*;

/// Driver id and value type of one control
#[derive(Debug, Clone)]
struct ControlInfo {
    id: u32,
    control_type: v4l::control::Type,
}

/// Map a V4L2 control name onto the controls the station drives
fn classify_control(name: &str) -> Option<ControlType> {
    match name.to_ascii_lowercase().as_str() {
        "exposure" | "exposure (absolute)" | "exposure time, absolute" | "exposure_time_absolute"
        | "exposure_absolute" => Some(ControlType::Exposure),
        "brightness" => Some(ControlType::Brightness),
        "contrast" => Some(ControlType::Contrast),
        "saturation" => Some(ControlType::Saturation),
        _ => None,
    }
}

pub struct V4lDeviceControl {
    device: Device,
    controls: HashMap<ControlType, ControlInfo>,
    name: String,
}

impl V4lDeviceControl {
    /// Open `/dev/video<index>` and look up its controls by name.
    pub fn open(index: usize) -> CameraResult<Self> {
        let device = Device::new(index)
            .map_err(|e| CameraError::HardwareError(format!("Failed to open video{index}: {e}")))?;

        let descriptions = device
            .query_controls()
            .map_err(|e| CameraError::HardwareError(format!("Failed to query controls: {e}")))?;

        let mut controls = HashMap::new();
        for desc in descriptions {
            if let Some(control) = classify_control(&desc.name) {
                controls.entry(control).or_insert(ControlInfo {
                    id: desc.id,
                    control_type: desc.typ,
                });
            }
        }
        if !controls.contains_key(&ControlType::Exposure) {
            return Err(CameraError::HardwareError(format!(
                "video{index} has no exposure control"
            )));
        }

        Ok(Self {
            device,
            controls,
            name: format!("video{index}"),
        })
    }
}

impl DeviceControl for V4lDeviceControl {
    fn set_control(&mut self, control: ControlType, value: i64) -> CameraResult<()> {
        let info = self
            .controls
            .get(&control)
            .ok_or_else(|| CameraError::ConfigError(format!("Control {control} not found")))?;

        let control_value = match info.control_type {
            v4l::control::Type::Boolean => v4l::control::Value::Boolean(value != 0),
            _ => v4l::control::Value::Integer(value),
        };

        self.device
            .set_control(v4l::Control {
                id: info.id,
                value: control_value,
            })
            .map_err(|e| CameraError::ControlError(format!("Failed to set {control} to {value}: {e}")))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

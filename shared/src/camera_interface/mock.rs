use super::{CameraError, CameraResult, ControlType, DeviceControl, FrameSource};
use ndarray::Array2;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// A single control request seen by [`MockDeviceControl`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCall {
    pub control: ControlType,
    pub value: i64,
}

impl DeviceCall {
    pub fn new(control: ControlType, value: i64) -> Self {
        Self { control, value }
    }
}

#[derive(Debug, Default)]
struct MockDeviceState {
    calls: Vec<DeviceCall>,
    failing: HashSet<ControlType>,
}

/// Device control that records successful requests in memory.
///
/// Clones share the same log, so a test can keep one handle while the other
/// is moved into the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceControl {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDeviceControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockDeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every future request for `control` fail
    pub fn fail_control(&self, control: ControlType) {
        self.lock().failing.insert(control);
    }

    /// Let requests for `control` succeed again
    pub fn restore_control(&self, control: ControlType) {
        self.lock().failing.remove(&control);
    }

    /// All successful requests so far
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Successful values applied to one control
    pub fn values_for(&self, control: ControlType) -> Vec<i64> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.control == control)
            .map(|c| c.value)
            .collect()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }
}

impl DeviceControl for MockDeviceControl {
    fn set_control(&mut self, control: ControlType, value: i64) -> CameraResult<()> {
        let mut state = self.lock();
        if state.failing.contains(&control) {
            return Err(CameraError::ControlError(format!(
                "mock device rejected {control}={value}"
            )));
        }
        state.calls.push(DeviceCall::new(control, value));
        Ok(())
    }

    fn name(&self) -> &str {
        "MockDevice"
    }
}

/// Frame source that replays a fixed list of frames.
pub struct MockFrameSource {
    frames: Vec<Array2<u8>>,
    index: usize,
    repeat: bool,
}

impl MockFrameSource {
    /// Replay `frames` once, then report no frame available
    pub fn new(frames: Vec<Array2<u8>>) -> Self {
        Self {
            frames,
            index: 0,
            repeat: false,
        }
    }

    /// Return the same frame forever
    pub fn new_repeating(frame: Array2<u8>) -> Self {
        Self {
            frames: vec![frame],
            index: 0,
            repeat: true,
        }
    }

    pub fn remaining(&self) -> usize {
        if self.repeat {
            usize::MAX
        } else {
            self.frames.len().saturating_sub(self.index)
        }
    }
}

impl FrameSource for MockFrameSource {
    fn next_frame(&mut self) -> CameraResult<Option<Array2<u8>>> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        if self.repeat {
            let frame = &self.frames[self.index % self.frames.len()];
            self.index += 1;
            return Ok(Some(frame.clone()));
        }
        let frame = self.frames.get(self.index).cloned();
        if frame.is_some() {
            self.index += 1;
        }
        Ok(frame)
    }

    fn name(&self) -> &str {
        "MockFrameSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_shared_log() {
        let device = MockDeviceControl::new();
        let mut moved = device.clone();

        moved.set_exposure(120).unwrap();
        moved.set_brightness(5).unwrap();

        assert_eq!(device.values_for(ControlType::Exposure), vec![120]);
        assert_eq!(device.calls().len(), 2);
    }

    #[test]
    fn test_mock_device_failure_toggle() {
        let mut device = MockDeviceControl::new();
        device.fail_control(ControlType::Exposure);
        assert!(device.set_exposure(100).is_err());

        device.restore_control(ControlType::Exposure);
        assert!(device.set_exposure(100).is_ok());
        assert_eq!(device.values_for(ControlType::Exposure), vec![100]);
    }

    #[test]
    fn test_mock_frame_source_runs_out() {
        let mut source = MockFrameSource::new(vec![Array2::zeros((2, 2)), Array2::ones((2, 2))]);

        assert_eq!(source.remaining(), 2);
        assert!(source.next_frame().unwrap().is_some());
        assert_eq!(source.next_frame().unwrap().unwrap()[[0, 0]], 1);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_mock_frame_source_repeating() {
        let mut source = MockFrameSource::new_repeating(Array2::from_elem((3, 3), 7u8));
        for _ in 0..5 {
            assert_eq!(source.next_frame().unwrap().unwrap()[[1, 1]], 7);
        }
    }
}

//! Blocking loop that feeds frames and operator clicks to the station

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use beamcheck::station::{BeamStation, FrameOutput};
use beamcheck::ViewFlags;
use shared::camera_interface::FrameSource;
use tracing::{debug, info, warn};

/// Pause when the source had no frame ready
pub const IDLE_DELAY: Duration = Duration::from_millis(10);

/// Operator click in frame pixels
pub type Click = (f64, f64);

pub struct FrameLoop<S: FrameSource> {
    source: S,
    station: BeamStation,
    clicks: Receiver<Click>,
    /// Cleared once the click sender is gone
    clicks_open: bool,
    frames: u64,
    /// View flags of the previous frame
    view: Option<ViewFlags>,
}

impl<S: FrameSource> FrameLoop<S> {
    pub fn new(source: S, station: BeamStation, clicks: Receiver<Click>) -> Self {
        Self {
            source,
            station,
            clicks,
            clicks_open: true,
            frames: 0,
            view: None,
        }
    }

    pub fn station(&self) -> &BeamStation {
        &self.station
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn drain_clicks(&mut self) {
        while self.clicks_open {
            match self.clicks.try_recv() {
                Ok((x, y)) => {
                    let outcome = self.station.handle_click(x, y);
                    info!("Click at ({x:.0}, {y:.0}): {outcome:?}");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Click input closed");
                    self.clicks_open = false;
                }
            }
        }
    }

    /// Handle pending clicks, then at most one frame.
    ///
    /// Returns `None` when the source had nothing ready. Source errors are
    /// logged and treated the same way.
    pub fn tick(&mut self, now: Instant) -> Option<FrameOutput> {
        self.drain_clicks();

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                warn!("{}: {e}", self.source.name());
                return None;
            }
        };

        let output = self.station.process_frame(&frame.view(), now);
        self.frames += 1;
        if let Some(step) = output.calibration_step {
            debug!("Calibration step {step}: {}", step.instruction());
        }
        if self.view.as_ref() != Some(&output.view) {
            let v = &output.view;
            info!(
                "View: visible {} cross {} rotated {} pattern {}",
                v.visible, v.cross, v.rotated, v.pattern
            );
            self.view = Some(v.clone());
        }
        Some(output)
    }

    /// Run until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!("Frame loop started on {}", self.source.name());
        while running.load(Ordering::Relaxed) {
            if self.tick(Instant::now()).is_none() {
                thread::sleep(IDLE_DELAY);
            }
        }
        info!("Frame loop stopped after {} frames", self.frames);
    }
}

//! Per-frame measurement pipeline
//!
//! One call to [`BeamStation::process_frame`] runs the whole chain for a
//! raw frame: crop and recenter, autoexposure, detection, smoothing,
//! luminosity, classification and publication of the measurement for the
//! link task. The calibration workflow rides along inside the same call.
//! The controller's `run` keyword only steers the operator view and restarts
//! autoexposure when it switches on.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array2, ArrayView2};
use shared::camera_interface::DeviceControl;
use shared::image_proc::{crop_translate, flip_horizontal, frame_stats};
use shared::latest::LatestSlot;

use crate::autoexposure::{AutoExposure, ExposureMode, ExposureStep, RunTransition};
use crate::calibration::{
    CalibrationEvent, CalibrationInputs, CalibrationOutcome, CalibrationSession, CalibrationStep,
};
use crate::classifier::{classify, ClassificationResult, ToleranceWindow};
use crate::commands::{BeamSelector, CommandTable, PositionMode, ViewFlags};
use crate::config::StationConfig;
use crate::detection::{
    derive_angles, detect, AngleContext, BeamKind, DetectionResult, Diagnostics, FitState,
    PointSmoother, Segment,
};
use crate::error::DetectionError;
use crate::live::LiveConfig;
use crate::luminosity::{self, LuminosityReading};
use crate::protocol::Measurement;
use crate::store::ConfigPersistence;

/// Everything one frame produced
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub detection: DetectionResult,
    pub classification: Option<ClassificationResult>,
    pub luminosity: LuminosityReading,
    pub exposure: ExposureStep,
    /// Record queued for the controller
    pub measurement: Measurement,
    /// Recentered and brightened frame for the operator view
    pub display: Array2<u8>,
    pub view: ViewFlags,
    pub calibration_step: Option<CalibrationStep>,
}

/// Detection model and exposure mode chosen for one frame
struct FramePlan {
    kind: BeamKind,
    exposure: ExposureMode,
    /// Unknown beam type name, detection is skipped
    unknown: Option<String>,
}

pub struct BeamStation {
    live: LiveConfig,
    store: Box<dyn ConfigPersistence + Send>,
    device: Box<dyn DeviceControl>,
    outbox: Arc<LatestSlot<Measurement>>,
    fit_state: FitState,
    autoexposure: AutoExposure,
    run_edge: RunTransition,
    smoother: PointSmoother,
    calibration: CalibrationSession,
    last_selector: Option<BeamSelector>,
    last_inputs: CalibrationInputs,
}

impl BeamStation {
    pub fn new(
        live: LiveConfig,
        store: Box<dyn ConfigPersistence + Send>,
        device: Box<dyn DeviceControl>,
        outbox: Arc<LatestSlot<Measurement>>,
        now: Instant,
    ) -> Self {
        let config = live.config();
        Self {
            autoexposure: AutoExposure::new(config.autoexposure.clone(), now),
            smoother: PointSmoother::new(config.detection.point_median_window),
            live,
            store,
            device,
            outbox,
            fit_state: FitState::new(),
            run_edge: RunTransition::new(),
            calibration: CalibrationSession::new(),
            last_selector: None,
            last_inputs: CalibrationInputs::default(),
        }
    }

    pub fn live(&self) -> &LiveConfig {
        &self.live
    }

    pub fn fit_state(&self) -> &FitState {
        &self.fit_state
    }

    pub fn autoexposure(&self) -> &AutoExposure {
        &self.autoexposure
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    /// Route an operator click to the calibration workflow.
    ///
    /// Uses the measurements of the most recent frame.
    pub fn handle_click(&mut self, x: f64, y: f64) -> CalibrationOutcome {
        let inputs = self.last_inputs;
        self.calibration
            .handle(CalibrationEvent::Click(x, y), &inputs, &self.live, &*self.store)
    }

    /// Start or stop calibration when the beam type enters or leaves the
    /// calibration pseudo-type.
    fn follow_beam_selector(&mut self, selector: &BeamSelector) {
        let was_calibrating = self.last_selector.as_ref() == Some(&BeamSelector::Calibration);
        let calibrating = *selector == BeamSelector::Calibration;

        if calibrating && !was_calibrating {
            self.calibration.start(&self.live, &*self.store);
        } else if !calibrating && was_calibrating && self.calibration.is_active() {
            self.calibration.terminate(&self.live, &*self.store);
        }

        if let BeamSelector::Unknown(name) = selector {
            if self.last_selector.as_ref() != Some(selector) {
                log::warn!("Unknown beam type '{name}', detection disabled");
            }
        }
        if self.last_selector.as_ref() != Some(selector) {
            self.last_selector = Some(selector.clone());
        }
    }

    fn plan(&self, selector: &BeamSelector, commands: &CommandTable) -> FramePlan {
        if let Some(directive) = self.calibration.directive() {
            return FramePlan {
                kind: directive.kind,
                exposure: directive.exposure,
                unknown: None,
            };
        }
        match selector {
            BeamSelector::Measure(BeamKind::TwoSegment)
                if commands.position_mode() == PositionMode::ForcedOneSegment =>
            {
                FramePlan {
                    kind: BeamKind::OneSegment,
                    exposure: ExposureMode::Closed,
                    unknown: None,
                }
            }
            BeamSelector::Measure(kind) => FramePlan {
                kind: *kind,
                exposure: ExposureMode::Closed,
                unknown: None,
            },
            BeamSelector::Unknown(name) => FramePlan {
                kind: BeamKind::TwoSegment,
                exposure: ExposureMode::Closed,
                unknown: Some(name.clone()),
            },
            // Calibration selected but the session already finished or was terminated
            BeamSelector::Calibration => FramePlan {
                kind: BeamKind::TwoSegment,
                exposure: ExposureMode::Closed,
                unknown: None,
            },
        }
    }

    /// Run the pipeline on one raw frame.
    pub fn process_frame(&mut self, raw: &ArrayView2<u8>, now: Instant) -> FrameOutput {
        let selector = self.live.read(|s| s.commands.beam_selector());
        self.follow_beam_selector(&selector);

        // Calibration may have swapped the configuration
        let snapshot = self.live.snapshot();
        let config = &snapshot.config;
        let commands = &snapshot.commands;
        self.autoexposure.set_params(config.autoexposure.clone());
        self.smoother.set_window(config.detection.point_median_window);

        if self.run_edge.update(commands.is_running()) {
            self.autoexposure.reset(now);
        }
        if self.calibration.take_exposure_reset() {
            self.autoexposure.reset(now);
        }

        let plan = self.plan(&selector, commands);
        let mirrored = commands.position_mode() == PositionMode::Mirrored;

        let geometry = &config.geometry;
        let prepared = crop_translate(raw, geometry.crop_center, geometry.crop_w, geometry.crop_h);
        let analysis = if mirrored {
            flip_horizontal(&prepared.analysis.view())
        } else {
            prepared.analysis
        };
        let (height, width) = analysis.dim();

        let peak = frame_stats(&analysis.view()).peak;
        let exposure = self
            .autoexposure
            .update(peak, plan.exposure, self.device.as_mut(), now);
        if exposure.converged {
            self.fit_state.reset_window();
        }

        let angle_ctx = AngleContext {
            qin: commands.qin(),
            tilt_px: commands.tilt_px(),
            focal_constant: config.detection.focal_constant,
        };

        let mut detection = match &plan.unknown {
            Some(name) => {
                let stats = frame_stats(&analysis.view());
                DetectionResult::failed(
                    plan.kind,
                    DetectionError::UnknownBeamType(name.clone()),
                    Diagnostics {
                        peak: stats.peak,
                        saturated_fraction: stats.saturated_fraction,
                        ..Diagnostics::default()
                    },
                )
            }
            None => detect(
                &analysis.view(),
                plan.kind,
                &mut self.fit_state,
                &config.detection,
                &angle_ctx,
            ),
        };

        if mirrored {
            unmirror(&mut detection, width);
        }
        if let Some(point) = detection.point {
            let smoothed = self.smoother.push(plan.kind, point);
            detection.point = Some(smoothed);
            detection.angles = derive_angles(smoothed, detection.slope, (width, height), &angle_ctx);
        }

        let sample_at = match detection.point {
            Some((x, y)) if mirrored => (width as f64 - x, y),
            Some(point) => point,
            None => config.frame_center(),
        };
        let reading = luminosity::measure(
            &analysis.view(),
            sample_at,
            (geometry.crop_w, geometry.crop_h),
            self.autoexposure.setting(),
            plan.kind,
            &config.luminosity,
            &config.calibration,
        );

        let classification = detection.point.map(|point| {
            let window = ToleranceWindow::from_commands(config.frame_center(), commands, &config.tolerance);
            classify(point, &window)
        });

        let measurement = build_measurement(&detection, classification.as_ref(), &reading);
        self.outbox.publish(measurement);

        self.last_inputs = CalibrationInputs {
            converged: exposure.converged,
            px_lux: reading.px_lux,
            point: detection.point,
            nominal_lux: commands.nominal_lux(),
        };
        let inputs = self.last_inputs;
        self.calibration
            .handle(CalibrationEvent::Frame, &inputs, &self.live, &*self.store);

        log_frame(config, &detection, classification.as_ref(), &reading);

        FrameOutput {
            detection,
            classification,
            luminosity: reading,
            exposure,
            measurement,
            display: prepared.display,
            view: commands.view_flags(),
            calibration_step: self.calibration.is_active().then(|| self.calibration.step()),
        }
    }
}

/// Map a result found in a mirrored frame back to frame coordinates
fn unmirror(detection: &mut DetectionResult, width: usize) {
    let w = width as f64;
    let flip = |p: (f64, f64)| (w - p.0, p.1);
    detection.point = detection.point.map(flip);
    detection.slope = detection.slope.map(|m| -m);
    detection.segments = detection
        .segments
        .iter()
        .map(|s| Segment {
            start: flip(s.start),
            end: flip(s.end),
        })
        .collect();
    detection.fitted_points = detection.fitted_points.iter().copied().map(flip).collect();
}

fn build_measurement(
    detection: &DetectionResult,
    classification: Option<&ClassificationResult>,
    reading: &LuminosityReading,
) -> Measurement {
    let magnitudes = classification.map(|c| {
        (
            c.left.value(),
            c.right.value(),
            c.up.value(),
            c.down.value(),
        )
    });
    let (left, right, up, down) = magnitudes.unwrap_or((0, 0, 0, 0));
    Measurement {
        point: detection.point,
        lux: reading.lux,
        roll: detection.angles.roll,
        yaw: detection.angles.yaw,
        pitch: detection.angles.pitch,
        left,
        right,
        up,
        down,
    }
}

fn log_frame(
    config: &StationConfig,
    detection: &DetectionResult,
    classification: Option<&ClassificationResult>,
    reading: &LuminosityReading,
) {
    if !config.debug {
        return;
    }
    match (detection.point, classification) {
        (Some((x, y)), Some(c)) => log::debug!(
            "{} at ({x:.1}, {y:.1}) {} lux {:.2} peak {}",
            detection.kind.beam_type(),
            c.status,
            reading.lux,
            detection.diagnostics.peak
        ),
        _ => log::debug!(
            "{} not found ({}), lux {:.2}",
            detection.kind.beam_type(),
            detection
                .failure()
                .map(ToString::to_string)
                .unwrap_or_default(),
            reading.lux
        ),
    }
}

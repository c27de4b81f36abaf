//! One run of the detector: calibrate first, then detect.

use std::time::Duration;
use tracing::info;

use crate::blow::{BlowEvent, BlowIndicator, BlowStateMachine};
use crate::calibrator::{BaselineCalibrator, Calibration};
use crate::config::DetectorConfig;

enum Phase {
    Calibrating(BaselineCalibrator),
    Detecting(BlowStateMachine),
}

/// What a single frame step observed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionStep {
    /// Baseline, set only on the frame that finished calibration
    pub calibrated: Option<f32>,
    pub blow: Option<BlowEvent>,
}

pub struct DetectionSession {
    phase: Phase,
    indicator: BlowIndicator,
    config: DetectorConfig,
}

impl DetectionSession {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            phase: Phase::Calibrating(BaselineCalibrator::new(config.calibration_frames)),
            indicator: BlowIndicator::new(config.blowing_display),
            config: config.clone(),
        }
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.phase, Phase::Calibrating(_))
    }

    pub fn is_blowing(&self) -> bool {
        self.indicator.is_active()
    }

    /// None until calibration has finished
    pub fn baseline(&self) -> Option<f32> {
        match &self.phase {
            Phase::Calibrating(_) => None,
            Phase::Detecting(machine) => Some(machine.baseline()),
        }
    }

    /// Calibration progress as (collected, target)
    pub fn calibration_progress(&self) -> (usize, usize) {
        match &self.phase {
            Phase::Calibrating(c) => (c.collected(), c.target()),
            Phase::Detecting(_) => (self.config.calibration_frames, self.config.calibration_frames),
        }
    }

    /// Feed one frame's level. During calibration the state machine does not run.
    pub fn step(&mut self, level: f32, now: Duration) -> SessionStep {
        self.indicator.refresh(now);

        match &mut self.phase {
            Phase::Calibrating(calibrator) => match calibrator.push(level) {
                Calibration::Pending { .. } => SessionStep::default(),
                Calibration::Complete(baseline) => {
                    let machine = BlowStateMachine::new(baseline, &self.config);
                    info!(
                        baseline,
                        adjusted_threshold = machine.adjusted_threshold(),
                        "Baseline calibrated"
                    );
                    self.phase = Phase::Detecting(machine);
                    SessionStep {
                        calibrated: Some(baseline),
                        blow: None,
                    }
                }
            },
            Phase::Detecting(machine) => {
                let blow = machine.step(level, now);
                if blow.is_some() {
                    self.indicator.trigger(now);
                }
                SessionStep {
                    calibrated: None,
                    blow,
                }
            }
        }
    }
}

//! Ambient noise baseline, measured over the first frames of a session.

/// Result of feeding one sample to the calibrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// Still collecting; `collected` of `target` samples so far
    Pending { collected: usize, target: usize },
    /// The buffer just filled; carries the baseline
    Complete(f32),
}

#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    samples: Vec<f32>,
    target: usize,
}

impl BaselineCalibrator {
    pub fn new(target: usize) -> Self {
        let target = target.max(1);
        Self {
            samples: Vec::with_capacity(target),
            target,
        }
    }

    pub fn collected(&self) -> usize {
        self.samples.len()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Append one frame's level. Malformed levels (NaN, infinite, negative)
    /// are recorded as silence so they cannot poison the mean.
    ///
    /// Consumes the calibrator's buffer on completion; callers replace the
    /// calibrator with the returned baseline and never push again.
    pub fn push(&mut self, level: f32) -> Calibration {
        let level = if level.is_finite() && level >= 0.0 {
            level
        } else {
            0.0
        };
        self.samples.push(level);

        if self.samples.len() < self.target {
            return Calibration::Pending {
                collected: self.samples.len(),
                target: self.target,
            };
        }

        let baseline = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        self.samples = Vec::new();
        Calibration::Complete(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_completes_after_exactly_target_samples() {
        let mut calibrator = BaselineCalibrator::new(50);
        let mut expected_sum = 0.0f32;

        for i in 0..49 {
            let level = (i % 7) as f32 * 0.01;
            expected_sum += level;
            assert!(matches!(
                calibrator.push(level),
                Calibration::Pending { collected, target: 50 } if collected == i + 1
            ));
        }

        expected_sum += 0.2;
        match calibrator.push(0.2) {
            Calibration::Complete(baseline) => {
                assert_relative_eq!(baseline, expected_sum / 50.0, epsilon = 1e-6)
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(calibrator.collected(), 0);
    }

    #[test]
    fn test_malformed_levels_count_as_silence() {
        let mut calibrator = BaselineCalibrator::new(4);
        calibrator.push(0.4);
        calibrator.push(f32::NAN);
        calibrator.push(-1.0);
        match calibrator.push(0.4) {
            Calibration::Complete(baseline) => assert_relative_eq!(baseline, 0.2),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_target_still_needs_one_sample() {
        let mut calibrator = BaselineCalibrator::new(0);
        assert_eq!(calibrator.target(), 1);
        assert_eq!(calibrator.push(0.3), Calibration::Complete(0.3));
    }
}

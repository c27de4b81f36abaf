//! Detector tuning parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DetectError, Result};

/// Number of frames averaged into the ambient baseline (~0.8s at 60fps)
pub const DEFAULT_CALIBRATION_FRAMES: usize = 50;

/// Fraction of the spectrum (from the bottom) where blowing puts its energy
pub const DEFAULT_BAND_FRACTION: f32 = 0.15;

/// What `start()` does when a session is already live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Keep the live session, the call is a no-op
    #[default]
    Ignore,
    /// Tear the live session down and start over with a fresh calibration
    Restart,
}

/// When the state machine may fire again after a confirmed blow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RearmPolicy {
    /// A breath held past the cooldown fires again without dropping below threshold
    #[default]
    Sustained,
    /// The level must fall back to the threshold before the next blow can fire
    RequireRelease,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Level above the baseline that counts as blowing (0-1 scale)
    pub threshold: f32,
    /// How long the level must stay above threshold before a blow is confirmed
    pub min_duration: Duration,
    /// Minimum time between two confirmed blows
    pub cooldown: Duration,
    /// How long `is_blowing` stays true after a blow
    pub blowing_display: Duration,
    pub calibration_frames: usize,
    pub band_fraction: f32,

    // Analyser settings, mirroring a browser AnalyserNode
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,

    pub restart_policy: RestartPolicy,
    pub rearm_policy: RearmPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            min_duration: Duration::from_millis(300),
            cooldown: Duration::from_millis(3000),
            blowing_display: Duration::from_millis(200),
            calibration_frames: DEFAULT_CALIBRATION_FRAMES,
            band_fraction: DEFAULT_BAND_FRACTION,
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            restart_policy: RestartPolicy::default(),
            rearm_policy: RearmPolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Number of frequency bins in each snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.calibration_frames == 0 {
            return Err(DetectError::InvalidConfig(
                "calibration_frames must be at least 1".into(),
            ));
        }
        if !(self.band_fraction > 0.0 && self.band_fraction <= 1.0) {
            return Err(DetectError::InvalidConfig(format!(
                "band_fraction must be in (0, 1], got {}",
                self.band_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(DetectError::InvalidConfig(format!(
                "smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(DetectError::InvalidConfig(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.fft_size
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(DetectError::InvalidConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(DetectError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

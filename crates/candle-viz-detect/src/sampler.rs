//! Per-frame loudness in the low sub-band where blowing into a microphone
//! puts most of its energy (roughly 0-500 Hz). Voices and room noise higher
//! up the spectrum are ignored.

use crate::config::DEFAULT_BAND_FRACTION;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeSampler {
    band_fraction: f32,
}

impl Default for AmplitudeSampler {
    fn default() -> Self {
        Self::new(DEFAULT_BAND_FRACTION)
    }
}

impl AmplitudeSampler {
    pub fn new(band_fraction: f32) -> Self {
        Self { band_fraction }
    }

    /// Number of bins (from bin 0) averaged for a snapshot of `bin_count` bins.
    /// Never zero for a non-empty snapshot.
    pub fn band_len(&self, bin_count: usize) -> usize {
        if bin_count == 0 {
            return 0;
        }
        let len = (bin_count as f32 * self.band_fraction).floor() as usize;
        len.clamp(1, bin_count)
    }

    /// Mean magnitude of the low band, normalized to 0-1
    pub fn level(&self, bins: &[u8]) -> f32 {
        let band = self.band_len(bins.len());
        if band == 0 {
            return 0.0;
        }
        let sum: u32 = bins[..band].iter().map(|&b| b as u32).sum();
        sum as f32 / band as f32 / 255.0
    }
}

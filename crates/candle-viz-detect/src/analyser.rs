//! Spectrum analysis of microphone PCM.
//!
//! Produces byte-scaled frequency snapshots the same way a browser
//! `AnalyserNode` does: Blackman window, FFT, per-bin temporal smoothing,
//! then a linear map from a decibel range onto 0-255.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::config::DetectorConfig;

pub struct SpectrumAnalyser {
    // FFT resources (pre-allocated)
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,

    /// Smoothed linear magnitude per bin, carried across frames
    smoothed: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyser {
    pub fn new(config: &DetectorConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Pre-compute Blackman window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            window,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_buffer.len()
    }

    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse the most recent `fft_size` samples and write one byte per bin into `out`.
    ///
    /// Fewer samples than `fft_size` are zero-padded; non-finite samples count as silence.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut Vec<u8>) {
        let fft_size = self.fft_size();
        let recent = &samples[samples.len().saturating_sub(fft_size)..];

        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let sample = recent.get(i).copied().filter(|s| s.is_finite()).unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / fft_size as f32;
        let range = self.max_decibels - self.min_decibels;

        out.clear();
        out.reserve(self.smoothed.len());
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[bin].norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - self.min_decibels) / range).clamp(0.0, 255.0) as u8
            } else {
                0
            };
            out.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, amplitude: f32, fft_size: usize) -> Vec<f32> {
        (0..fft_size)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / fft_size as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_silence_is_all_zero() {
        let mut analyser = SpectrumAnalyser::new(&DetectorConfig::default());
        let mut out = Vec::new();
        analyser.byte_frequency_data(&vec![0.0; 512], &mut out);

        assert_eq!(out.len(), 256);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_low_tone_lands_in_low_bins() {
        let mut analyser = SpectrumAnalyser::new(&DetectorConfig::default());
        let tone = sine(10, 0.5, 512);
        let mut out = Vec::new();

        // Let the smoothing settle
        for _ in 0..30 {
            analyser.byte_frequency_data(&tone, &mut out);
        }

        assert!(out[10] > 200, "peak bin too quiet: {}", out[10]);
        let high_max = out[128..].iter().copied().max().unwrap_or(0);
        assert!(high_max < 16, "energy leaked to high bins: {}", high_max);
    }

    #[test]
    fn test_smoothing_decays_after_tone_stops() {
        let mut analyser = SpectrumAnalyser::new(&DetectorConfig::default());
        let tone = sine(10, 0.5, 512);
        let mut out = Vec::new();

        for _ in 0..30 {
            analyser.byte_frequency_data(&tone, &mut out);
        }
        let loud = out[10];

        analyser.byte_frequency_data(&vec![0.0; 512], &mut out);
        assert!(out[10] > 0 && out[10] <= loud);
    }

    #[test]
    fn test_new_analyser_has_no_history() {
        let mut analyser = SpectrumAnalyser::new(&DetectorConfig::default());
        let tone = sine(10, 0.5, 512);
        let mut out = Vec::new();
        for _ in 0..30 {
            analyser.byte_frequency_data(&tone, &mut out);
        }

        let mut fresh = SpectrumAnalyser::new(&DetectorConfig::default());
        fresh.byte_frequency_data(&vec![0.0; 512], &mut out);
        assert_eq!(out[10], 0);
    }

    #[test]
    fn test_short_and_malformed_input() {
        let mut analyser = SpectrumAnalyser::new(&DetectorConfig::default());
        let mut out = Vec::new();
        analyser.byte_frequency_data(&[f32::NAN, f32::INFINITY, 0.0], &mut out);

        assert_eq!(out.len(), analyser.bin_count());
        assert!(out.iter().all(|&b| b == 0));
    }
}

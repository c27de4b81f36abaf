//! Microphone capture and stream management.
//!
//! Handles input devices via cpal: device enumeration, the permission probe,
//! and a ring buffer of recent samples that is turned into a frequency
//! snapshot once per frame.

use candle_viz_detect::{
    DetectError, DetectorConfig, InputProvider, InputStream, Result, SpectrumAnalyser,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, Device, SampleFormat, Stream, StreamConfig,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Samples kept for analysis (more than any sane fft_size)
pub const RING_CAPACITY: usize = 4096;

type SampleRing = Arc<Mutex<VecDeque<f32>>>;

pub struct DeviceInfo {
    pub device: Device,
    pub name: String,
}

pub struct MicrophoneInput {
    devices: Vec<DeviceInfo>,
    current_device: Option<usize>,
    timeout: Duration,
    detector: DetectorConfig,
}

impl MicrophoneInput {
    /// Pick `preferred` if present, else the host's default input, else the first input
    pub fn new(preferred: Option<&str>, timeout: Duration, detector: &DetectorConfig) -> Self {
        let devices = Self::collect_devices();

        let current_device = preferred
            .and_then(|name| devices.iter().position(|d| d.name == name))
            .or_else(|| {
                let host = cpal::default_host();
                let default_name = host.default_input_device().and_then(|d| d.name().ok());
                default_name.and_then(|name| devices.iter().position(|d| d.name == name))
            })
            .or(if devices.is_empty() { None } else { Some(0) });

        match current_device {
            Some(idx) => info!("[{}] Selected input: {}", idx, devices[idx].name),
            None => warn!("No audio input devices found"),
        }

        Self {
            devices,
            current_device,
            timeout,
            detector: detector.clone(),
        }
    }

    pub fn list_devices() {
        let host = cpal::default_host();
        println!("\n=== Input Devices ===");

        if let Ok(inputs) = host.input_devices() {
            for (idx, device) in inputs.enumerate() {
                if let Ok(name) = device.name() {
                    println!("  [{}] {}", idx, name);
                }
            }
        }
        println!("Press Tab to switch devices\n");
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo { device, name });
                }
            }
        }

        devices
    }

    pub fn device_name(&self) -> Option<&str> {
        self.current_device.map(|idx| self.devices[idx].name.as_str())
    }

    /// Move to the next input device. Callers restart detection afterwards.
    pub fn select_next_device(&mut self) -> Option<&str> {
        if self.devices.is_empty() {
            return None;
        }
        let next = self
            .current_device
            .map_or(0, |idx| (idx + 1) % self.devices.len());
        self.current_device = Some(next);
        info!("[{}] Selecting: {}", next, self.devices[next].name);
        self.device_name()
    }

    fn current(&self) -> Result<&DeviceInfo> {
        self.current_device
            .map(|idx| &self.devices[idx])
            .ok_or(DetectError::NoInputDevice)
    }

    /// Get device config with timeout (the config call often hangs on bad devices)
    fn get_config_with_timeout(device: &Device, timeout: Duration) -> Result<StreamConfig> {
        let device_clone = device.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let _ = tx.send(device_clone.default_input_config());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(config)) => {
                check_sample_format(config.sample_format())?;
                Ok(config.into())
            }
            Ok(Err(e)) => Err(config_error(e)),
            Err(_) => Err(DetectError::DeviceTimeout(timeout)),
        }
    }

    fn build_stream(info: &DeviceInfo, timeout: Duration, ring: SampleRing) -> Result<Stream> {
        let stream_config = Self::get_config_with_timeout(&info.device, timeout)?;
        let channels = stream_config.channels as usize;
        debug!(
            device = %info.name,
            channels = channels as u64,
            sample_rate = stream_config.sample_rate.0,
            "Building input stream"
        );

        let err_fn = |err| error!("Audio stream error: {}", err);

        info.device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut ring) = ring.lock() {
                        push_frames(&mut ring, data, channels);
                    }
                },
                err_fn,
                None,
            )
            .map_err(build_error)
    }
}

impl InputProvider for MicrophoneInput {
    type Stream = MicrophoneStream;

    fn probe(&mut self) -> Result<()> {
        let info = self.current()?;
        let ring = Arc::new(Mutex::new(VecDeque::new()));
        // Opening the device is the permission check; release it straight away
        let stream = Self::build_stream(info, self.timeout, ring)?;
        drop(stream);
        Ok(())
    }

    fn open(&mut self) -> Result<MicrophoneStream> {
        let info = self.current()?;
        let ring: SampleRing = Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY)));

        let stream =
            Self::build_stream(info, self.timeout, Arc::clone(&ring)).map_err(|e| match e {
                DetectError::PermissionDenied(msg) => DetectError::AcquisitionFailed(msg),
                other => other,
            })?;
        stream
            .play()
            .map_err(|e| DetectError::AcquisitionFailed(e.to_string()))?;

        Ok(MicrophoneStream {
            _stream: stream,
            ring,
            analyser: SpectrumAnalyser::new(&self.detector),
            scratch: Vec::with_capacity(RING_CAPACITY),
            device: info.name.clone(),
        })
    }
}

/// A playing input stream plus the analyser that reads it
pub struct MicrophoneStream {
    _stream: Stream,
    ring: SampleRing,
    analyser: SpectrumAnalyser,
    scratch: Vec<f32>,
    device: String,
}

impl InputStream for MicrophoneStream {
    fn frequency_data(&mut self, bins: &mut Vec<u8>) {
        self.scratch.clear();
        if let Ok(ring) = self.ring.lock() {
            self.scratch.extend(ring.iter().copied());
        }
        self.analyser.byte_frequency_data(&self.scratch, bins);
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        debug!(device = %self.device, "Microphone released");
    }
}

/// The capture callback only takes f32 samples
fn check_sample_format(format: SampleFormat) -> Result<()> {
    if format == SampleFormat::F32 {
        Ok(())
    } else {
        Err(DetectError::AcquisitionFailed(format!(
            "unsupported sample format {:?}",
            format
        )))
    }
}

/// Only a refusal to open counts as a denial; format problems are acquisition failures
fn config_error(e: DefaultStreamConfigError) -> DetectError {
    match e {
        DefaultStreamConfigError::StreamTypeNotSupported => {
            DetectError::AcquisitionFailed(e.to_string())
        }
        other => DetectError::PermissionDenied(other.to_string()),
    }
}

fn build_error(e: BuildStreamError) -> DetectError {
    match e {
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            DetectError::AcquisitionFailed(e.to_string())
        }
        other => DetectError::PermissionDenied(other.to_string()),
    }
}

/// Downmix interleaved frames to mono and append, keeping at most RING_CAPACITY samples
fn push_frames(ring: &mut VecDeque<f32>, data: &[f32], channels: usize) {
    let channels = channels.max(1);
    for chunk in data.chunks(channels) {
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(chunk.iter().sum::<f32>() / chunk.len() as f32);
    }
}

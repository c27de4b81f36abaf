//! Configuration file management.
//!
//! Handles loading and saving user preferences to `~/.candle-viz.toml`.

use candle_viz_detect::{DetectorConfig, RearmPolicy, RestartPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_CANDLE_COUNT: usize = 8;

const CONFIG_TEMPLATE: &str = r#"# candle-viz configuration file

# Timeout in seconds when opening an audio device (default: 3)
# device_timeout_secs = 3

# Last selected input device (auto-saved)
# last_device = "Device Name"

# Log level when RUST_LOG is not set: error, warn, info, debug, trace
# log_level = "info"

# Start listening as soon as the window opens
# auto_start = true

# Number of candles on the cake
# candle_count = 8

# =============================================================================
# Blow Detection
# =============================================================================

# blow_threshold = 0.05           # Level above the ambient baseline (0-1)
# blow_duration_ms = 300          # How long the level must stay up
# blow_cooldown_ms = 3000         # Minimum time between blows
# blowing_display_ms = 200        # How long the "blowing" flag stays on
# calibration_frames = 50         # Frames averaged into the baseline
# band_fraction = 0.15            # Lowest part of the spectrum that is measured

# What a held breath does after a blow: "sustained" fires again after the
# cooldown, "require-release" waits until the level drops first
# rearm_policy = "sustained"

# What starting while already listening does: "ignore" or "restart"
# restart_policy = "ignore"

# =============================================================================
# Analyser
# =============================================================================

# fft_size = 512                  # Power of two; bins = fft_size / 2
# smoothing = 0.8                 # Per-bin smoothing between frames, 0-1
"#;

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
    pub last_device: Option<String>,
    pub device_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub auto_start: Option<bool>,
    pub candle_count: Option<usize>,

    // Blow detection (flattened for simpler TOML)
    pub blow_threshold: Option<f32>,
    pub blow_duration_ms: Option<u64>,
    pub blow_cooldown_ms: Option<u64>,
    pub blowing_display_ms: Option<u64>,
    pub calibration_frames: Option<usize>,
    pub band_fraction: Option<f32>,
    pub rearm_policy: Option<RearmPolicy>,
    pub restart_policy: Option<RestartPolicy>,

    // Analyser
    pub fft_size: Option<usize>,
    pub smoothing: Option<f32>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".candle-viz.toml"))
    }

    /// Runs before logging is set up, so problems go straight to stderr
    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        // Create template file if it doesn't exist
        if !path.exists() && fs::write(&path, CONFIG_TEMPLATE).is_ok() {
            eprintln!("Created config template at {:?}", path);
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self) {
        let Some(path) = Self::path() else {
            return;
        };
        match toml::to_string(self) {
            Ok(content) => match fs::write(&path, content) {
                Ok(()) => info!("Config saved to {:?}", path),
                Err(e) => warn!("Failed to save config to {:?}: {}", path, e),
            },
            Err(e) => warn!("Failed to serialize config: {}", e),
        }
    }

    pub fn set_device(&mut self, name: &str) {
        self.last_device = Some(name.to_string());
        self.save();
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(
            self.device_timeout_secs
                .unwrap_or(DEFAULT_DEVICE_TIMEOUT_SECS),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn auto_start(&self) -> bool {
        self.auto_start.unwrap_or(true)
    }

    pub fn candle_count(&self) -> usize {
        self.candle_count.unwrap_or(DEFAULT_CANDLE_COUNT).max(1)
    }

    /// Get blow detection configuration with defaults
    pub fn detection(&self) -> DetectorConfig {
        let defaults = DetectorConfig::default();
        DetectorConfig {
            threshold: self.blow_threshold.unwrap_or(defaults.threshold),
            min_duration: self
                .blow_duration_ms
                .map_or(defaults.min_duration, Duration::from_millis),
            cooldown: self
                .blow_cooldown_ms
                .map_or(defaults.cooldown, Duration::from_millis),
            blowing_display: self
                .blowing_display_ms
                .map_or(defaults.blowing_display, Duration::from_millis),
            calibration_frames: self
                .calibration_frames
                .unwrap_or(defaults.calibration_frames),
            band_fraction: self.band_fraction.unwrap_or(defaults.band_fraction),
            fft_size: self.fft_size.unwrap_or(defaults.fft_size),
            smoothing: self.smoothing.unwrap_or(defaults.smoothing),
            restart_policy: self.restart_policy.unwrap_or(defaults.restart_policy),
            rearm_policy: self.rearm_policy.unwrap_or(defaults.rearm_policy),
            ..defaults
        }
    }
}

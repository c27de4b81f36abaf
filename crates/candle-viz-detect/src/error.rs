//! Error taxonomy for microphone acquisition and detector setup.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    /// The platform refused access to the microphone
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("no audio input device available")]
    NoInputDevice,

    /// Querying the device configuration hung (common with stale ALSA/Pulse devices)
    #[error("audio device did not respond within {0:?}")]
    DeviceTimeout(Duration),

    /// Stream or analysis pipeline setup failed after permission was granted
    #[error("failed to start audio input: {0}")]
    AcquisitionFailed(String),

    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}

impl DetectError {
    /// Whether this error means access was refused rather than a transient fault
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            DetectError::PermissionDenied(_) | DetectError::NoInputDevice
        )
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;

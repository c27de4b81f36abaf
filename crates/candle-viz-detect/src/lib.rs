//! Microphone blow detection.
//!
//! Listens to a microphone, measures the ambient noise floor, then reports a
//! discrete blow whenever low-frequency loudness stays above that floor for
//! long enough. The host calls [`DetectorController::on_frame`] once per
//! display frame; everything else happens inside that call.

pub mod analyser;
pub mod blow;
pub mod calibrator;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod session;

pub use analyser::SpectrumAnalyser;
pub use blow::{BlowEvent, BlowIndicator, BlowState, BlowStateMachine};
pub use calibrator::{BaselineCalibrator, Calibration};
pub use config::{DetectorConfig, RearmPolicy, RestartPolicy};
pub use controller::{DetectorController, DetectorState, FrameReport, InputProvider, InputStream};
pub use error::{DetectError, Result};
pub use sampler::AmplitudeSampler;
pub use session::{DetectionSession, SessionStep};

//! Detector lifecycle: permission, start/stop, resource ownership and the
//! per-frame loop.
//!
//! The host drives the loop by calling [`DetectorController::on_frame`] once
//! per display frame. A live session keeps exactly one frame pending; `stop()`
//! cancels it, and a frame callback that finds nothing pending (or a pending
//! frame from an older session) returns without doing work or rescheduling.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::blow::BlowEvent;
use crate::config::{DetectorConfig, RestartPolicy};
use crate::error::{DetectError, Result};
use crate::sampler::AmplitudeSampler;
use crate::session::DetectionSession;

/// A live microphone feed that can be sampled once per frame
pub trait InputStream {
    /// Replace `bins` with the current byte frequency snapshot
    fn frequency_data(&mut self, bins: &mut Vec<u8>);
}

/// Source of microphone streams. Dropping a stream must release the device.
pub trait InputProvider {
    type Stream: InputStream;

    /// Check that the microphone can be opened, releasing it again immediately
    fn probe(&mut self) -> Result<()>;

    /// Acquire a live stream for a detection session
    fn open(&mut self) -> Result<Self::Stream>;
}

#[derive(Debug, Clone, PartialEq)]
enum Permission {
    Unknown,
    Granted,
    Denied(DetectError),
}

/// Snapshot of the caller-visible flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorState {
    pub is_listening: bool,
    pub is_calibrating: bool,
    pub is_blowing: bool,
    pub permission_granted: bool,
}

/// What one live frame observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Low-band level for this frame (0-1)
    pub level: f32,
    /// Baseline, on the frame where calibration finished
    pub calibrated: Option<f32>,
    pub blow: Option<BlowEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameTicket {
    generation: u64,
}

struct ActiveSession<S> {
    generation: u64,
    session: DetectionSession,
    stream: S,
}

pub struct DetectorController<P: InputProvider> {
    provider: P,
    config: DetectorConfig,
    sampler: AmplitudeSampler,
    permission: Permission,
    last_error: Option<DetectError>,

    active: Option<ActiveSession<P::Stream>>,
    pending_frame: Option<FrameTicket>,
    generation: u64,
    bins: Vec<u8>,
}

impl<P: InputProvider> DetectorController<P> {
    pub fn new(provider: P, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            sampler: AmplitudeSampler::new(config.band_fraction),
            bins: Vec::with_capacity(config.bin_count()),
            config,
            permission: Permission::Unknown,
            last_error: None,
            active: None,
            pending_frame: None,
            generation: 0,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_calibrating(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.session.is_calibrating())
    }

    pub fn is_blowing(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.session.is_blowing())
    }

    pub fn permission_granted(&self) -> bool {
        self.permission == Permission::Granted
    }

    /// Why the last permission request was refused, if it was
    pub fn permission_error(&self) -> Option<&DetectError> {
        match &self.permission {
            Permission::Denied(e) => Some(e),
            _ => None,
        }
    }

    /// The most recent failure from `request_permission` or `start`
    pub fn last_error(&self) -> Option<&DetectError> {
        self.last_error.as_ref()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.active.as_ref().and_then(|a| a.session.baseline())
    }

    /// Calibration progress of the live session as (collected, target)
    pub fn calibration_progress(&self) -> Option<(usize, usize)> {
        self.active
            .as_ref()
            .map(|a| a.session.calibration_progress())
    }

    pub fn state(&self) -> DetectorState {
        DetectorState {
            is_listening: self.is_listening(),
            is_calibrating: self.is_calibrating(),
            is_blowing: self.is_blowing(),
            permission_granted: self.permission_granted(),
        }
    }

    /// Probe microphone access. Safe to call repeatedly; a later call can
    /// turn an earlier denial into a grant.
    pub fn request_permission(&mut self) -> bool {
        match self.provider.probe() {
            Ok(()) => {
                debug!("Microphone permission granted");
                self.permission = Permission::Granted;
                self.last_error = None;
                true
            }
            Err(e) => {
                warn!("Microphone permission denied: {}", e);
                self.last_error = Some(e.clone());
                self.permission = Permission::Denied(e);
                false
            }
        }
    }

    /// Begin a detection session. Returns whether a session is live afterwards.
    pub fn start(&mut self) -> bool {
        if self.active.is_some() {
            match self.config.restart_policy {
                RestartPolicy::Ignore => {
                    debug!("Blow detection already running, ignoring start");
                    return true;
                }
                RestartPolicy::Restart => {
                    debug!("Blow detection already running, restarting");
                    self.stop();
                }
            }
        }

        if !self.permission_granted() && !self.request_permission() {
            return false;
        }

        let stream = match self.provider.open() {
            Ok(stream) => stream,
            Err(e) => {
                error!("Error starting blow detection: {}", e);
                self.last_error = Some(e);
                self.stop();
                return false;
            }
        };

        self.generation += 1;
        self.active = Some(ActiveSession {
            generation: self.generation,
            session: DetectionSession::new(&self.config),
            stream,
        });
        self.pending_frame = Some(FrameTicket {
            generation: self.generation,
        });
        self.last_error = None;

        info!(
            calibration_frames = self.config.calibration_frames as u64,
            "Blow detection started, calibrating baseline"
        );
        true
    }

    /// End the session and release the microphone. Safe to call at any time.
    pub fn stop(&mut self) {
        self.pending_frame = None;
        if let Some(active) = self.active.take() {
            drop(active);
            info!("Blow detection stopped");
        }
    }

    /// Per-frame callback. Returns None when no session frame was pending.
    pub fn on_frame(&mut self, now: Duration) -> Option<FrameReport> {
        let ticket = self.pending_frame.take()?;

        let active = match self.active.as_mut() {
            Some(active) if active.generation == ticket.generation => active,
            _ => {
                debug!(generation = ticket.generation, "Dropping stale frame");
                return None;
            }
        };

        active.stream.frequency_data(&mut self.bins);
        let level = self.sampler.level(&self.bins);
        let step = active.session.step(level, now);

        self.pending_frame = Some(ticket);

        Some(FrameReport {
            level,
            calibrated: step.calibrated,
            blow: step.blow,
        })
    }
}

impl<P: InputProvider> Drop for DetectorController<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Shared view into what the fake microphone has been asked to do
    #[derive(Default)]
    struct Probe {
        deny: Cell<bool>,
        fail_open: Cell<bool>,
        probes: Cell<usize>,
        opens: Cell<usize>,
        releases: Cell<usize>,
        bins: RefCell<Vec<u8>>,
    }

    struct FakeMic(Rc<Probe>);

    struct FakeStream(Rc<Probe>);

    impl InputStream for FakeStream {
        fn frequency_data(&mut self, bins: &mut Vec<u8>) {
            bins.clear();
            bins.extend_from_slice(&self.0.bins.borrow());
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.0.releases.set(self.0.releases.get() + 1);
        }
    }

    impl InputProvider for FakeMic {
        type Stream = FakeStream;

        fn probe(&mut self) -> Result<()> {
            self.0.probes.set(self.0.probes.get() + 1);
            if self.0.deny.get() {
                Err(DetectError::PermissionDenied("NotAllowedError".into()))
            } else {
                Ok(())
            }
        }

        fn open(&mut self) -> Result<FakeStream> {
            if self.0.fail_open.get() {
                return Err(DetectError::AcquisitionFailed("device busy".into()));
            }
            self.0.opens.set(self.0.opens.get() + 1);
            Ok(FakeStream(Rc::clone(&self.0)))
        }
    }

    fn set_level(probe: &Probe, byte: u8) {
        *probe.bins.borrow_mut() = vec![byte; 256];
    }

    fn frame(i: u64) -> Duration {
        Duration::from_micros(i * 16_667)
    }

    fn fake_controller_with(config: DetectorConfig) -> (DetectorController<FakeMic>, Rc<Probe>) {
        let probe = Rc::new(Probe::default());
        set_level(&probe, 0);
        let controller = DetectorController::new(FakeMic(Rc::clone(&probe)), config)
            .expect("valid config");
        (controller, probe)
    }

    fn fake_controller() -> (DetectorController<FakeMic>, Rc<Probe>) {
        fake_controller_with(DetectorConfig::default())
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            fft_size: 100,
            ..Default::default()
        };
        let probe = Rc::new(Probe::default());
        assert!(DetectorController::new(FakeMic(probe), config).is_err());
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_before_start() {
        let (mut controller, probe) = fake_controller();

        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), DetectorState::default());

        assert!(controller.start());
        controller.stop();
        controller.stop();

        let state = controller.state();
        assert!(!state.is_listening && !state.is_calibrating && !state.is_blowing);
        assert_eq!(probe.releases.get(), 1);
    }

    #[test]
    fn test_permission_denied_aborts_start() {
        let (mut controller, probe) = fake_controller();
        probe.deny.set(true);

        assert!(!controller.start());
        assert!(!controller.is_listening());
        assert!(!controller.permission_granted());
        assert_eq!(probe.opens.get(), 0);
        assert!(matches!(
            controller.permission_error(),
            Some(DetectError::PermissionDenied(_))
        ));

        // Recoverable by asking again
        probe.deny.set(false);
        assert!(controller.request_permission());
        assert!(controller.permission_error().is_none());
        assert!(controller.start());
    }

    #[test]
    fn test_grant_clears_earlier_denial() {
        let (mut controller, probe) = fake_controller();
        probe.deny.set(true);
        assert!(!controller.request_permission());
        assert!(controller.last_error().is_some());

        probe.deny.set(false);
        assert!(controller.request_permission());
        assert!(controller.permission_granted());
        assert!(controller.permission_error().is_none());
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn test_permission_is_probed_once() {
        let (mut controller, probe) = fake_controller();
        assert!(controller.start());
        controller.stop();
        assert!(controller.start());
        assert_eq!(probe.probes.get(), 1);
        assert_eq!(probe.opens.get(), 2);
    }

    #[test]
    fn test_acquisition_failure_rolls_back() {
        let (mut controller, probe) = fake_controller();
        probe.fail_open.set(true);

        assert!(!controller.start());
        assert!(controller.permission_granted());
        assert!(!controller.is_listening());
        assert!(!controller.is_blowing());
        assert!(controller.on_frame(frame(0)).is_none());
        assert!(matches!(
            controller.last_error(),
            Some(DetectError::AcquisitionFailed(_))
        ));
    }

    #[test]
    fn test_frames_are_noops_when_not_listening() {
        let (mut controller, _probe) = fake_controller();
        assert!(controller.on_frame(frame(0)).is_none());

        controller.start();
        assert!(controller.on_frame(frame(1)).is_some());
        controller.stop();
        assert!(controller.on_frame(frame(2)).is_none());
        assert!(controller.on_frame(frame(3)).is_none());
    }

    #[test]
    fn test_stale_frame_from_old_session_is_dropped() {
        let (mut controller, _probe) = fake_controller();
        controller.start();
        let stale = controller.pending_frame;

        controller.stop();
        controller.start();
        controller.pending_frame = stale;

        assert!(controller.on_frame(frame(0)).is_none());
        // The stale callback did not reschedule itself
        assert!(controller.pending_frame.is_none());
    }

    #[test]
    fn test_full_session_detects_blow() {
        let (mut controller, probe) = fake_controller();
        // 0.10 baseline: bytes of 25.5 are not possible, use 26/255 ~= 0.102
        set_level(&probe, 26);
        controller.start();
        assert!(controller.is_calibrating());

        let mut i = 0;
        let mut calibrated = None;
        while calibrated.is_none() {
            let report = controller.on_frame(frame(i)).expect("live frame");
            assert!(report.blow.is_none());
            calibrated = report.calibrated;
            i += 1;
        }
        assert_eq!(i, 50);
        assert!(!controller.is_calibrating());

        // 51/255 = 0.2, well above 0.102 + 0.05
        set_level(&probe, 51);
        let blows = (i..i + 21)
            .filter_map(|i| controller.on_frame(frame(i)))
            .filter(|r| r.blow.is_some())
            .count();
        assert_eq!(blows, 1);
        assert!(controller.is_blowing());

        controller.stop();
        assert!(!controller.is_blowing());
    }

    #[test]
    fn test_double_start_ignored_by_default() {
        let (mut controller, probe) = fake_controller();
        controller.start();
        for i in 0..10 {
            controller.on_frame(frame(i));
        }

        assert!(controller.start());
        assert_eq!(probe.opens.get(), 1);
        assert_eq!(controller.calibration_progress(), Some((10, 50)));
    }

    #[test]
    fn test_double_start_restarts_when_configured() {
        let (mut controller, probe) = fake_controller_with(DetectorConfig {
            restart_policy: RestartPolicy::Restart,
            ..Default::default()
        });
        controller.start();
        for i in 0..60 {
            controller.on_frame(frame(i));
        }
        assert!(!controller.is_calibrating());

        assert!(controller.start());
        assert_eq!(probe.opens.get(), 2);
        assert_eq!(probe.releases.get(), 1);
        assert!(controller.is_calibrating());
        assert_eq!(controller.calibration_progress(), Some((0, 50)));
    }

    #[test]
    fn test_drop_releases_stream_exactly_once() {
        let (mut controller, probe) = fake_controller();
        controller.start();
        controller.stop();
        drop(controller);
        assert_eq!(probe.releases.get(), 1);

        let (mut controller, probe) = fake_controller();
        controller.start();
        drop(controller);
        assert_eq!(probe.releases.get(), 1);
    }
}

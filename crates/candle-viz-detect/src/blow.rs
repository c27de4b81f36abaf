//! Blow detection state machine.
//!
//! Turns the per-frame low-band level into discrete blow events. A blow is
//! confirmed once the level has stayed above `baseline + threshold` for longer
//! than `min_duration`, and at most once per `cooldown`:
//!
//! ```text
//! Idle --(level > threshold)--> Candidate --(held > min_duration && cooldown ok)--> fire
//!   ^                              |
//!   +------(level <= threshold)----+
//! ```
//!
//! Any frame at or below the threshold drops the candidate window, so a short
//! dip restarts the duration timer.

use std::time::Duration;
use tracing::{debug, info};

use crate::config::{DetectorConfig, RearmPolicy};

/// A confirmed blow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlowEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlowState {
    Idle,
    /// Level has been above threshold continuously since `since`
    Candidate { since: Duration },
}

pub struct BlowStateMachine {
    baseline: f32,
    threshold: f32,
    min_duration: Duration,
    cooldown: Duration,
    rearm: RearmPolicy,

    state: BlowState,
    /// None until the first blow of the session, so the first one is never held back
    last_blow_at: Option<Duration>,
    /// Cleared after a blow under `RearmPolicy::RequireRelease` until the level drops
    armed: bool,
}

impl BlowStateMachine {
    pub fn new(baseline: f32, config: &DetectorConfig) -> Self {
        Self {
            baseline,
            threshold: config.threshold,
            min_duration: config.min_duration,
            cooldown: config.cooldown,
            rearm: config.rearm_policy,
            state: BlowState::Idle,
            last_blow_at: None,
            armed: true,
        }
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// The level a frame must exceed to count as blowing
    pub fn adjusted_threshold(&self) -> f32 {
        self.baseline + self.threshold
    }

    pub fn state(&self) -> BlowState {
        self.state
    }

    pub fn last_blow_at(&self) -> Option<Duration> {
        self.last_blow_at
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        match self.last_blow_at {
            Some(at) => now.saturating_sub(at) > self.cooldown,
            None => true,
        }
    }

    /// Advance one frame. `now` must be monotonic across calls.
    pub fn step(&mut self, level: f32, now: Duration) -> Option<BlowEvent> {
        let threshold = self.adjusted_threshold();

        // NaN fails the comparison, negative levels are below any sane threshold
        let above = level.is_finite() && level >= 0.0 && level > threshold;
        if !above {
            self.state = BlowState::Idle;
            self.armed = true;
            return None;
        }

        let since = match self.state {
            BlowState::Idle => {
                self.state = BlowState::Candidate { since: now };
                debug!(
                    level,
                    baseline = self.baseline,
                    threshold,
                    "Blow candidate, starting timer"
                );
                return None;
            }
            BlowState::Candidate { since } => since,
        };

        let held = now.saturating_sub(since);
        if held <= self.min_duration || !self.cooldown_elapsed(now) || !self.armed {
            return None;
        }

        info!(
            level,
            baseline = self.baseline,
            threshold,
            held_ms = held.as_millis() as u64,
            since_last_ms = self.last_blow_at.map(|at| now.saturating_sub(at).as_millis() as u64),
            "Blow confirmed"
        );
        self.last_blow_at = Some(now);
        if self.rearm == RearmPolicy::RequireRelease {
            self.armed = false;
        }
        Some(BlowEvent)
    }
}

/// The caller-visible "blowing right now" flag, held for a fixed window after each blow
#[derive(Debug, Clone)]
pub struct BlowIndicator {
    display: Duration,
    until: Option<Duration>,
}

impl BlowIndicator {
    pub fn new(display: Duration) -> Self {
        Self {
            display,
            until: None,
        }
    }

    pub fn trigger(&mut self, now: Duration) {
        self.until = Some(now + self.display);
    }

    /// Clear the flag once its window has passed
    pub fn refresh(&mut self, now: Duration) {
        if matches!(self.until, Some(until) if now >= until) {
            debug!("Resetting blow state");
            self.until = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.until.is_some()
    }

    pub fn clear(&mut self) {
        self.until = None;
    }
}

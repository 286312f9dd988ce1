use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Readout shown whenever no session is running.
pub const ZERO_ELAPSED: &str = "00:00:00";

/// Lifecycle of the overlay clock as seen by the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    /// No session has ever been started.
    Idle,
    Running,
    StoppedAfterRun,
}

/// Point-in-time copy of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub running: bool,
    /// Set at every start; `None` until the first one.
    pub epoch: Option<Instant>,
}

impl Session {
    pub fn state(&self) -> ClockState {
        match (self.running, self.epoch) {
            (true, _) => ClockState::Running,
            (false, None) => ClockState::Idle,
            (false, Some(_)) => ClockState::StoppedAfterRun,
        }
    }

    /// Run time at `now`; zero when not running.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.running, self.epoch) {
            (true, Some(epoch)) => now.saturating_duration_since(epoch),
            _ => Duration::ZERO,
        }
    }
}

/// Start/stop toggle shared between the control surface and the clock.
///
/// Every transition and every read takes the lock for a copy-sized critical
/// section, so readers always see a consistent `(running, epoch)` pair.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<Session>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the session; the epoch always moves to `now`.
    pub fn start(&self, now: Instant) {
        let mut session = self.lock();
        session.running = true;
        session.epoch = Some(now);
        log::info!("Session started");
    }

    /// Stops the session. The epoch is left as it was.
    pub fn stop(&self) {
        let mut session = self.lock();
        if session.running {
            log::info!("Session stopped");
        }
        session.running = false;
    }

    /// Flips the session and returns whether it is now running.
    pub fn toggle(&self, now: Instant) -> bool {
        let mut session = self.lock();
        session.running = !session.running;
        if session.running {
            session.epoch = Some(now);
        }
        session.running
    }

    pub fn snapshot(&self) -> Session {
        *self.lock()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn state(&self) -> ClockState {
        self.snapshot().state()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `HH:MM:SS` with hours wrapping at 24 and sub-seconds truncated.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs() % 86_400;
    let (h, rem) = (secs / 3600, secs % 3600);
    let (m, s) = (rem / 60, rem % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a deadline timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogDecision {
    /// Nothing is playing and the deadline passed: clean up.
    Expire,
    /// Arm the timer again for the given instant.
    Reschedule(Instant),
    /// The watchdog was cancelled meanwhile.
    Stale,
}

/// Idle deadline bookkeeping. Timers are owned by the caller.
#[derive(Debug, Clone)]
pub struct IdleWatchdog {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl IdleWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn reset(&mut self, now: Instant) -> Instant {
        let deadline = now + self.timeout;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn on_deadline(&mut self, now: Instant, playing: bool) -> WatchdogDecision {
        let Some(deadline) = self.deadline else {
            return WatchdogDecision::Stale;
        };
        if now < deadline {
            return WatchdogDecision::Reschedule(deadline);
        }
        if playing {
            return WatchdogDecision::Reschedule(self.reset(now));
        }
        self.deadline = None;
        WatchdogDecision::Expire
    }
}

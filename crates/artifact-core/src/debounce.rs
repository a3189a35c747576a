//! Owned, cancellable autosave deadline.
//!
//! A [`DebounceTimer`] is a plain deadline owned by its session. Arming replaces any previous
//! deadline, cancelling clears it, and dropping the session drops the timer, so a timer can never
//! fire for a session that no longer exists. Firing is observed by polling with the current time.

use std::time::{Duration, Instant};

/// Single-slot debounce deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Create an unarmed timer with a fixed `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The fixed quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending deadline and schedule a new one `delay` after `now`.
    pub fn rearm(&mut self, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        deadline
    }

    /// Cancel the pending deadline, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Pending deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// If the deadline has passed at `now`, disarm and return `true`.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

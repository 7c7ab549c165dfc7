//! [`HoldTimer`]: a stopwatch for the strength evaluation.
//!
//! Counts whole seconds from `start` to `release`.  Time is passed in by the
//! caller so the UI can use its frame clock.

use std::time::Instant;

#[derive(Debug, Default)]
pub struct HoldTimer {
    started: Option<Instant>,
    /// Result of the last release, shown until the next start.
    last_secs: u64,
}

impl HoldTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_holding(&self) -> bool {
        self.started.is_some()
    }

    /// Begin a hold.  Returns `false` if one is already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started.is_some() {
            return false;
        }
        self.started = Some(now);
        self.last_secs = 0;
        log::debug!("hold: started");
        true
    }

    /// End the hold and return its length, or `None` if none was running.
    pub fn release(&mut self, now: Instant) -> Option<u64> {
        let started = self.started.take()?;
        self.last_secs = now.saturating_duration_since(started).as_secs();
        log::debug!("hold: released after {} s", self.last_secs);
        Some(self.last_secs)
    }

    /// Seconds held so far, or the last result when idle.
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        match self.started {
            Some(started) => now.saturating_duration_since(started).as_secs(),
            None => self.last_secs,
        }
    }
}

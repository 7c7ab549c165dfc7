//! Phase alternation driven by whole-second ticks.
//!
//! [`CadenceController`] owns the timer state exclusively.  It is `Send` and
//! lock-free by itself; the session layer wraps it in a mutex together with a
//! generation counter so a cancelled ticker can never touch it again.

use thiserror::Error;

use super::mode::CadenceConfig;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One of the two alternating breathing states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Inhale,
    Exhale,
}

impl Phase {
    /// The phase that follows this one.
    pub fn flipped(self) -> Phase {
        match self {
            Phase::Inhale => Phase::Exhale,
            Phase::Exhale => Phase::Inhale,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::Exhale => "Exhale",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Inhale
    }
}

// ---------------------------------------------------------------------------
// Events and snapshots
// ---------------------------------------------------------------------------

/// Emitted whenever a phase is entered: once on activation (always
/// `Inhale`) and once per threshold crossing afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEvent {
    pub phase: Phase,
    /// Whole seconds since activation at the moment of entry.
    pub at_secs: u64,
}

/// Result of a tick that landed on an active controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whole seconds since activation, including this tick.
    pub elapsed_total: u64,
    /// `Some` when this tick crossed the phase threshold.
    pub entered: Option<PhaseEvent>,
}

/// Read-only view of the timer for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub active: bool,
    pub phase: Phase,
    pub elapsed_in_phase: u32,
    pub seconds_per_phase: u32,
    /// Seconds counted in the current (or most recent) session.
    pub elapsed_total: u64,
}

impl TimerSnapshot {
    /// Progress through the current phase in `[0.0, 1.0)`.
    ///
    /// ```
    /// use kegel_coach::cadence::{Phase, TimerSnapshot};
    ///
    /// let snap = TimerSnapshot {
    ///     active: true,
    ///     phase: Phase::Exhale,
    ///     elapsed_in_phase: 1,
    ///     seconds_per_phase: 4,
    ///     elapsed_total: 9,
    /// };
    /// assert!((snap.phase_fraction() - 0.25).abs() < f32::EPSILON);
    /// ```
    pub fn phase_fraction(&self) -> f32 {
        if self.seconds_per_phase == 0 {
            return 0.0;
        }
        self.elapsed_in_phase as f32 / self.seconds_per_phase as f32
    }
}

// ---------------------------------------------------------------------------
// TimerError
// ---------------------------------------------------------------------------

/// Misuse of the activation lifecycle.  None of these change any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyActive,

    #[error("timer is not running")]
    NotActive,

    #[error("cadence cannot change while the timer is running")]
    ModeLocked,

    #[error("timer has been shut down")]
    ShutDown,
}

// ---------------------------------------------------------------------------
// CadenceController
// ---------------------------------------------------------------------------

/// The inhale/exhale state machine.
///
/// Invariant: while active, `elapsed_in_phase < seconds_per_phase`.  While
/// inactive the state is `{Inhale, 0}`.
#[derive(Debug, Clone, Default)]
pub struct CadenceController {
    active: bool,
    phase: Phase,
    elapsed_in_phase: u32,
    elapsed_total: u64,
    /// Captured at `activate`, never re-read mid-session.
    config: CadenceConfig,
}

impl CadenceController {
    /// A controller in its initial state: inactive, `Inhale`, 0 s.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a session with `config` and enter `Inhale`.
    ///
    /// # Errors
    ///
    /// [`TimerError::AlreadyActive`] if a session is running; the running
    /// session is left as it was.
    pub fn activate(&mut self, config: CadenceConfig) -> Result<PhaseEvent, TimerError> {
        if self.active {
            return Err(TimerError::AlreadyActive);
        }

        self.active = true;
        self.phase = Phase::Inhale;
        self.elapsed_in_phase = 0;
        self.elapsed_total = 0;
        self.config = config;

        log::debug!(
            "cadence: activated ({} s per phase)",
            config.seconds_per_phase()
        );

        Ok(PhaseEvent {
            phase: Phase::Inhale,
            at_secs: 0,
        })
    }

    /// Advance by one second.
    ///
    /// Returns `None` when inactive; a stray tick can never change state.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.active {
            return None;
        }

        self.elapsed_in_phase += 1;
        self.elapsed_total += 1;

        let entered = if self.elapsed_in_phase >= self.config.seconds_per_phase() {
            self.phase = self.phase.flipped();
            self.elapsed_in_phase = 0;
            log::debug!(
                "cadence: {} at {} s",
                self.phase.label(),
                self.elapsed_total
            );
            Some(PhaseEvent {
                phase: self.phase,
                at_secs: self.elapsed_total,
            })
        } else {
            None
        };

        Some(TickOutcome {
            elapsed_total: self.elapsed_total,
            entered,
        })
    }

    /// Stop the session and return to `{Inhale, 0}`.
    ///
    /// `elapsed_total` keeps the length of the finished session until the
    /// next activation.
    ///
    /// # Errors
    ///
    /// [`TimerError::NotActive`] if no session is running.
    pub fn deactivate(&mut self) -> Result<(), TimerError> {
        if !self.active {
            return Err(TimerError::NotActive);
        }

        self.active = false;
        self.phase = Phase::Inhale;
        self.elapsed_in_phase = 0;

        log::debug!("cadence: deactivated after {} s", self.elapsed_total);
        Ok(())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            active: self.active,
            phase: self.phase,
            elapsed_in_phase: self.elapsed_in_phase,
            seconds_per_phase: self.config.seconds_per_phase(),
            elapsed_total: self.elapsed_total,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

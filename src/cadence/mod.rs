//! Breathing cadence: the inhale/exhale state machine.
//!
//! # State machine
//!
//! ```text
//!            activate()                 tick() × seconds_per_phase
//! Inactive ─────────────▶ Inhale ◀──────────────────────────────▶ Exhale
//!    ▲                      │                                       │
//!    └──────── deactivate() ┴───────────────────────────────────────┘
//! ```
//!
//! [`CadenceController`] is a plain value: it never schedules anything by
//! itself.  The periodic one-second trigger lives in
//! [`crate::session::BreathingTimer`], which calls
//! [`CadenceController::tick`] and forwards the resulting [`PhaseEvent`]s to
//! the cue player.
//!
//! # Quick start
//!
//! ```rust
//! use kegel_coach::cadence::{CadenceConfig, CadenceController, CadenceMode, Phase};
//!
//! let mut ctl = CadenceController::new();
//! let entered = ctl.activate(CadenceConfig::from(CadenceMode::Fast)).unwrap();
//! assert_eq!(entered.phase, Phase::Inhale);
//!
//! ctl.tick();
//! let outcome = ctl.tick().unwrap();
//! assert_eq!(outcome.entered.map(|e| e.phase), Some(Phase::Exhale));
//! ```

pub mod controller;
pub mod mode;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{CadenceController, Phase, PhaseEvent, TickOutcome, TimerError, TimerSnapshot};
pub use mode::{CadenceConfig, CadenceError, CadenceMode, ExerciseType};

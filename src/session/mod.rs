//! Breathing session lifecycle.
//!
//! [`BreathingTimer`] wraps the pure
//! [`CadenceController`](crate::cadence::CadenceController) with a tokio
//! ticker, forwards phase entries and mute changes to the cue loop, and
//! guarantees that no tick runs after `stop()` or drop.
//!
//! ```text
//! UI / hotkey ──start/stop/mute──▶ BreathingTimer
//!                                     │  ticker task (1 s)
//!                                     ▼
//!                              CueCommand (mpsc) ──▶ run_cue_loop ──▶ CuePlayer
//! ```
//!
//! [`HoldTimer`] is the separate stopwatch used by the strength evaluation.

pub mod hold;
pub mod timer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use hold::HoldTimer;
pub use timer::{BreathingTimer, SharedTimer, TimerCore, TimerOptions, TICK_PERIOD};

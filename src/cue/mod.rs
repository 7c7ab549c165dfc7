//! Audio cues: one short sound at the start of every breathing phase.
//!
//! # Pipeline
//!
//! ```text
//! FileCueLoader (spawn_blocking)                     CuePlayer
//!   symphonia decode → downmix_to_mono → resample ──▶  Loaded ─┐
//!                                                              ▼
//! BreathingTimer ── CueCommand::PhaseEntered ──────▶ on_phase_entered
//!                                                              │
//!                                                              ▼
//!                                            CueOutput (cpal stream voice)
//! ```
//!
//! The player owns both cue resources and the single playback slot.  It is
//! driven exclusively through [`CueCommand`]s by [`run_cue_loop`], so the
//! timer never waits on audio and audio failures never reach the timer.

pub mod loader;
pub mod output;
pub mod player;
pub mod resample;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cadence::Phase;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use loader::FileCueLoader;
pub use output::{CpalCueOutput, CueStreamHandle, OutputError, SilentOutput};
pub use player::{run_cue_loop, CueCommand, CueOutcome, CuePlayer};
pub use resample::{downmix_to_mono, resample};

// ---------------------------------------------------------------------------
// CueKind
// ---------------------------------------------------------------------------

/// Which of the two pre-defined cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    Inhale,
    Exhale,
}

impl From<Phase> for CueKind {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Inhale => CueKind::Inhale,
            Phase::Exhale => CueKind::Exhale,
        }
    }
}

impl CueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CueKind::Inhale => "inhale",
            CueKind::Exhale => "exhale",
        }
    }
}

// ---------------------------------------------------------------------------
// CueClip
// ---------------------------------------------------------------------------

/// A decoded cue: mono `f32` PCM at the output device's sample rate.
///
/// Cloning shares the sample data.
#[derive(Debug, Clone)]
pub struct CueClip {
    pub kind: CueKind,
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl CueClip {
    pub fn new(kind: CueKind, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            kind,
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// CueError
// ---------------------------------------------------------------------------

/// Everything that can go wrong on the audio side.  None of it is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CueError {
    #[error("cannot read cue file: {0}")]
    Io(String),

    #[error("cannot decode cue: {0}")]
    Decode(String),

    #[error("cannot resample cue: {0}")]
    Resample(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("audio output device is no longer available")]
    DeviceUnavailable,

    #[error("cue load was cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Asynchronous source of decoded cue clips.
#[async_trait]
pub trait CueLoader: Send + Sync {
    /// Load and decode the clip for `kind`.
    async fn load(&self, kind: CueKind) -> Result<CueClip, CueError>;
}

/// Sink that can sound one clip at a time.
///
/// `start` always plays from sample zero; `halt` stops and rewinds.
pub trait CueOutput: Send {
    fn start(&mut self, clip: &CueClip) -> Result<(), CueError>;
    fn halt(&mut self);
    fn is_playing(&self) -> bool;
}

impl<O: CueOutput + ?Sized> CueOutput for Box<O> {
    fn start(&mut self, clip: &CueClip) -> Result<(), CueError> {
        (**self).start(clip)
    }

    fn halt(&mut self) {
        (**self).halt()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }
}

//! Presentation adapter: timer snapshot → what the breathing circle looks
//! like.
//!
//! Everything here is a pure function of the [`TimerSnapshot`] and the
//! [`ExerciseType`]; the egui layer only paints the result.
//!
//! | Exercise     | Inhale label       | Exhale label       | Expands on |
//! |--------------|--------------------|--------------------|------------|
//! | `Kegel`      | Inhale & Squeeze   | Exhale & Release   | inhale     |
//! | `Relaxation` | Inhale & Push      | Exhale & Relax     | exhale     |

use std::time::{Duration, Instant};

use eframe::egui::Color32;

use crate::cadence::{ExerciseType, Phase, TimerSnapshot};

/// Circle scale at full expansion.
pub const EXPANDED_SCALE: f32 = 1.1;
/// Circle scale when contracted, and whenever the timer is inactive.
pub const CONTRACTED_SCALE: f32 = 0.6;

/// Subtracted from the phase length so the circle settles just before the
/// next flip.
const TRANSITION_LEAD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Background and circle colours for one exercise type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color32,
    pub circle: Color32,
}

impl Palette {
    pub const KEGEL: Palette = Palette {
        background: Color32::from_rgb(0xD3, 0xE4, 0xFD),
        circle: Color32::from_rgb(0x9B, 0x87, 0xF5),
    };

    pub const RELAXATION: Palette = Palette {
        background: Color32::from_rgb(0xF2, 0xFC, 0xE2),
        circle: Color32::from_rgb(0x6C, 0xB2, 0x8E),
    };

    pub fn for_exercise(exercise: ExerciseType) -> Palette {
        match exercise {
            ExerciseType::Kegel => Palette::KEGEL,
            ExerciseType::Relaxation => Palette::RELAXATION,
        }
    }
}

// ---------------------------------------------------------------------------
// CircleView
// ---------------------------------------------------------------------------

/// Everything the UI needs to draw one frame of the breathing circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleView {
    /// Scale the circle should be animating towards.
    pub target_scale: f32,
    /// Zero while inactive: the circle snaps instead of animating.
    pub transition: Duration,
    pub palette: Palette,
    pub label: &'static str,
}

impl CircleView {
    pub fn new(snapshot: &TimerSnapshot, exercise: ExerciseType) -> Self {
        let transition = if snapshot.active {
            transition_time(snapshot.seconds_per_phase)
        } else {
            Duration::ZERO
        };

        Self {
            target_scale: target_scale(snapshot, exercise),
            transition,
            palette: Palette::for_exercise(exercise),
            label: action_label(snapshot.phase, exercise),
        }
    }
}

/// `true` when `phase` is the expanding half of the cycle for `exercise`.
pub fn is_expanding(phase: Phase, exercise: ExerciseType) -> bool {
    match exercise {
        ExerciseType::Kegel => phase == Phase::Inhale,
        ExerciseType::Relaxation => phase == Phase::Exhale,
    }
}

pub fn target_scale(snapshot: &TimerSnapshot, exercise: ExerciseType) -> f32 {
    if snapshot.active && is_expanding(snapshot.phase, exercise) {
        EXPANDED_SCALE
    } else {
        CONTRACTED_SCALE
    }
}

pub fn action_label(phase: Phase, exercise: ExerciseType) -> &'static str {
    match (exercise, phase) {
        (ExerciseType::Kegel, Phase::Inhale) => "Inhale & Squeeze",
        (ExerciseType::Kegel, Phase::Exhale) => "Exhale & Release",
        (ExerciseType::Relaxation, Phase::Inhale) => "Inhale & Push",
        (ExerciseType::Relaxation, Phase::Exhale) => "Exhale & Relax",
    }
}

/// Animation length for one phase: the phase minus a 100 ms lead.
pub fn transition_time(seconds_per_phase: u32) -> Duration {
    Duration::from_secs(u64::from(seconds_per_phase)).saturating_sub(TRANSITION_LEAD)
}

// ---------------------------------------------------------------------------
// CircleAnimator
// ---------------------------------------------------------------------------

/// Eases the drawn scale towards the current [`CircleView::target_scale`].
#[derive(Debug, Clone, Copy)]
pub struct CircleAnimator {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

impl CircleAnimator {
    pub fn new(now: Instant) -> Self {
        Self {
            from: CONTRACTED_SCALE,
            to: CONTRACTED_SCALE,
            started: now,
            duration: Duration::ZERO,
        }
    }

    /// Start a new animation from the current drawn scale when `view`'s
    /// target differs from the one in flight.
    pub fn retarget(&mut self, view: &CircleView, now: Instant) {
        if (view.target_scale - self.to).abs() < f32::EPSILON {
            return;
        }
        self.from = self.scale_at(now);
        self.to = view.target_scale;
        self.started = now;
        self.duration = view.transition;
    }

    pub fn scale_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = now.saturating_duration_since(self.started).as_secs_f32()
            / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * ease_in_out(t.clamp(0.0, 1.0))
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) < self.duration
    }
}

/// Cubic ease-in-out on `[0, 1]`.
fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Cadence modes, exercise types and the validated per-phase duration.
//!
//! | Mode       | Seconds per phase |
//! |------------|-------------------|
//! | `normal`   | 5                 |
//! | `fast`     | 2                 |
//! | `very-fast`| 1                 |
//!
//! All enums serialise in kebab-case so they match the strings stored in
//! `settings.toml` and in the session log.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CadenceError
// ---------------------------------------------------------------------------

/// Rejected cadence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CadenceError {
    /// The mode string is not one of `normal`, `fast`, `very-fast`.
    #[error("unknown cadence mode {0:?} (expected normal, fast or very-fast)")]
    UnknownMode(String),

    /// The exercise type string is not one of `kegel`, `relaxation`.
    #[error("unknown exercise type {0:?} (expected kegel or relaxation)")]
    UnknownExercise(String),

    /// A phase must last at least one second.
    #[error("seconds per phase must be positive")]
    NonPositive,
}

// ---------------------------------------------------------------------------
// CadenceMode
// ---------------------------------------------------------------------------

/// Speed selector shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CadenceMode {
    Normal,
    Fast,
    VeryFast,
}

impl CadenceMode {
    /// Every mode, slowest first.
    pub const ALL: [CadenceMode; 3] = [CadenceMode::Normal, CadenceMode::Fast, CadenceMode::VeryFast];

    /// Nominal duration of one phase in seconds.
    pub fn seconds_per_phase(self) -> u32 {
        match self {
            CadenceMode::Normal => 5,
            CadenceMode::Fast => 2,
            CadenceMode::VeryFast => 1,
        }
    }

    /// Config-file spelling of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            CadenceMode::Normal => "normal",
            CadenceMode::Fast => "fast",
            CadenceMode::VeryFast => "very-fast",
        }
    }

    /// Label for the mode selector.
    pub fn label(self) -> &'static str {
        match self {
            CadenceMode::Normal => "Normal",
            CadenceMode::Fast => "Fast",
            CadenceMode::VeryFast => "Very Fast",
        }
    }
}

impl Default for CadenceMode {
    fn default() -> Self {
        CadenceMode::Normal
    }
}

impl fmt::Display for CadenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CadenceMode {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(CadenceMode::Normal),
            "fast" => Ok(CadenceMode::Fast),
            "very-fast" => Ok(CadenceMode::VeryFast),
            other => Err(CadenceError::UnknownMode(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ExerciseType
// ---------------------------------------------------------------------------

/// What the user is training.  Has no effect on timing; the presentation
/// layer uses it to pick colours, labels and the direction of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    /// Contract on the inhale, release on the exhale.
    #[serde(alias = "kegal")]
    Kegel,
    /// Reverse Kegel: push on the inhale, relax on the exhale.
    Relaxation,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 2] = [ExerciseType::Kegel, ExerciseType::Relaxation];

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::Kegel => "kegel",
            ExerciseType::Relaxation => "relaxation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExerciseType::Kegel => "Kegel",
            ExerciseType::Relaxation => "Relaxation",
        }
    }
}

impl Default for ExerciseType {
    fn default() -> Self {
        ExerciseType::Kegel
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kegel" | "kegal" => Ok(ExerciseType::Kegel),
            "relaxation" => Ok(ExerciseType::Relaxation),
            other => Err(CadenceError::UnknownExercise(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CadenceConfig
// ---------------------------------------------------------------------------

/// Validated phase duration.  The only way to build one is through
/// [`CadenceConfig::from_seconds`] or a [`CadenceMode`], so
/// `seconds_per_phase() > 0` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceConfig {
    seconds_per_phase: u32,
}

impl CadenceConfig {
    /// Build a config from a raw duration.
    ///
    /// ```
    /// use kegel_coach::cadence::{CadenceConfig, CadenceError};
    ///
    /// assert_eq!(CadenceConfig::from_seconds(3).unwrap().seconds_per_phase(), 3);
    /// assert_eq!(CadenceConfig::from_seconds(0), Err(CadenceError::NonPositive));
    /// ```
    pub fn from_seconds(seconds_per_phase: u32) -> Result<Self, CadenceError> {
        if seconds_per_phase == 0 {
            return Err(CadenceError::NonPositive);
        }
        Ok(Self { seconds_per_phase })
    }

    pub fn seconds_per_phase(&self) -> u32 {
        self.seconds_per_phase
    }
}

impl From<CadenceMode> for CadenceConfig {
    fn from(mode: CadenceMode) -> Self {
        Self {
            seconds_per_phase: mode.seconds_per_phase(),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        CadenceMode::default().into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Missing tables and keys fall back to their defaults, so a hand-written
//! `settings.toml` only needs the values it changes.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cadence::{CadenceMode, ExerciseType};
use crate::session::TimerOptions;

// ---------------------------------------------------------------------------
// TimerConfig
// ---------------------------------------------------------------------------

/// Cadence selection restored at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// `normal` (5 s), `fast` (2 s) or `very-fast` (1 s) per phase.
    pub mode: CadenceMode,
    /// `kegel` or `relaxation`.
    pub exercise_type: ExerciseType,
}

// ---------------------------------------------------------------------------
// CueConfig
// ---------------------------------------------------------------------------

/// Audio cue files and playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    /// Inhale cue.  `None` means `<data>/sounds/inhale.mp3`.
    pub inhale_path: Option<PathBuf>,
    /// Exhale cue.  `None` means `<data>/sounds/exhale.mp3`.
    pub exhale_path: Option<PathBuf>,
    pub start_muted: bool,
    /// Output gain (0.0 – 1.0).
    pub volume: f32,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            inhale_path: None,
            exhale_path: None,
            start_muted: false,
            volume: 1.0,
        }
    }
}

impl CueConfig {
    pub fn resolved_inhale(&self, paths: &AppPaths) -> PathBuf {
        self.inhale_path
            .clone()
            .unwrap_or_else(|| paths.default_inhale_cue())
    }

    pub fn resolved_exhale(&self, paths: &AppPaths) -> PathBuf {
        self.exhale_path
            .clone()
            .unwrap_or_else(|| paths.default_exhale_cue())
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Starts or stops a session (e.g. `"F8"`).
    pub toggle_session_key: String,
    /// Mutes or unmutes the cues (e.g. `"F7"`).
    pub toggle_mute_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_session_key: "F8".into(),
            toggle_mute_key: "F7".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` lets
    /// the window manager pick.
    pub window_position: Option<(f32, f32)>,
    pub always_on_top: bool,
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

/// Session and evaluation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record finished sessions and evaluations.
    pub enabled: bool,
    /// Overrides `<data>/sessions.jsonl`.
    pub log_path: Option<PathBuf>,
    /// Overrides `<data>/evaluations.jsonl`.
    pub evaluations_path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
            evaluations_path: None,
        }
    }
}

impl HistoryConfig {
    pub fn resolved_log_path(&self, paths: &AppPaths) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| paths.sessions_file.clone())
    }

    pub fn resolved_evaluations_path(&self, paths: &AppPaths) -> PathBuf {
        self.evaluations_path
            .clone()
            .unwrap_or_else(|| paths.evaluations_file.clone())
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use kegel_coach::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timer: TimerConfig,
    pub cues: CueConfig,
    pub hotkey: HotkeyConfig,
    pub ui: UiConfig,
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Initial [`TimerOptions`] for the breathing timer.
    pub fn timer_options(&self) -> TimerOptions {
        TimerOptions {
            mode: self.timer.mode,
            exercise_type: self.timer.exercise_type,
            muted: self.cues.start_muted,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

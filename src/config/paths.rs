//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\kegel-coach\
//!   macOS:   ~/Library/Application Support/kegel-coach/
//!   Linux:   ~/.config/kegel-coach/
//!
//! Data dir (cue sounds, session and evaluation logs):
//!   Windows: %LOCALAPPDATA%\kegel-coach\
//!   macOS:   ~/Library/Application Support/kegel-coach/
//!   Linux:   ~/.local/share/kegel-coach/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding `inhale.mp3` and `exhale.mp3`.
    pub sounds_dir: PathBuf,
    /// Default session history file (`sessions.jsonl`).
    pub sessions_file: PathBuf,
    /// Default strength evaluation file (`evaluations.jsonl`).
    pub evaluations_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "kegel-coach";

    /// Resolves all paths using the `dirs` crate, falling back to the
    /// current directory when the platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            sounds_dir: data_dir.join("sounds"),
            sessions_file: data_dir.join("sessions.jsonl"),
            evaluations_file: data_dir.join("evaluations.jsonl"),
        }
    }

    pub fn default_inhale_cue(&self) -> PathBuf {
        self.sounds_dir.join("inhale.mp3")
    }

    pub fn default_exhale_cue(&self) -> PathBuf {
        self.sounds_dir.join("exhale.mp3")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

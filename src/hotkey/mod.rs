//! Global hotkeys for starting/stopping a session and muting cues, backed
//! by `rdev`.
//!
//! `rdev::listen()` blocks forever, so it runs on a dedicated OS thread (see
//! [`HotkeyListener`]).  Key presses are translated into [`HotkeyEvent`]s
//! and handed to the UI over a bounded `tokio::sync::mpsc` channel.
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use kegel_coach::config::HotkeyConfig;
//! use kegel_coach::hotkey::{HotkeyBindings, HotkeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let bindings = HotkeyBindings::from_config(&HotkeyConfig::default()).unwrap();
//! let _listener = HotkeyListener::start(bindings, tx).unwrap();
//!
//! // The UI drains `rx` with `try_recv` every frame.
//! ```

pub mod listener;

pub use listener::HotkeyListener;

use thiserror::Error;

use crate::config::HotkeyConfig;

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Start a session if idle, stop it if running.
    ToggleSession,
    ToggleMute,
}

// ---------------------------------------------------------------------------
// HotkeyBindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("unknown key name {0:?}")]
    UnknownKey(String),

    #[error("session and mute hotkeys are both bound to {0:?}")]
    Conflict(String),
}

/// The two keys the listener watches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub toggle_session: rdev::Key,
    pub toggle_mute: rdev::Key,
}

impl HotkeyBindings {
    /// Resolve the key names in `config`.
    ///
    /// # Errors
    ///
    /// [`HotkeyError::UnknownKey`] for a name [`parse_key`] does not know,
    /// [`HotkeyError::Conflict`] when both actions share one key.
    pub fn from_config(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        let resolve = |name: &str| {
            parse_key(name).ok_or_else(|| HotkeyError::UnknownKey(name.to_owned()))
        };
        let toggle_session = resolve(&config.toggle_session_key)?;
        let toggle_mute = resolve(&config.toggle_mute_key)?;

        if toggle_session == toggle_mute {
            return Err(HotkeyError::Conflict(config.toggle_session_key.clone()));
        }

        Ok(Self {
            toggle_session,
            toggle_mute,
        })
    }

    /// The event bound to `key`, if any.
    pub fn event_for(&self, key: rdev::Key) -> Option<HotkeyEvent> {
        if key == self.toggle_session {
            Some(HotkeyEvent::ToggleSession)
        } else if key == self.toggle_mute {
            Some(HotkeyEvent::ToggleMute)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

const FUNCTION_KEYS: [rdev::Key; 12] = [
    rdev::Key::F1,
    rdev::Key::F2,
    rdev::Key::F3,
    rdev::Key::F4,
    rdev::Key::F5,
    rdev::Key::F6,
    rdev::Key::F7,
    rdev::Key::F8,
    rdev::Key::F9,
    rdev::Key::F10,
    rdev::Key::F11,
    rdev::Key::F12,
];

const LETTER_KEYS: [rdev::Key; 26] = [
    rdev::Key::KeyA,
    rdev::Key::KeyB,
    rdev::Key::KeyC,
    rdev::Key::KeyD,
    rdev::Key::KeyE,
    rdev::Key::KeyF,
    rdev::Key::KeyG,
    rdev::Key::KeyH,
    rdev::Key::KeyI,
    rdev::Key::KeyJ,
    rdev::Key::KeyK,
    rdev::Key::KeyL,
    rdev::Key::KeyM,
    rdev::Key::KeyN,
    rdev::Key::KeyO,
    rdev::Key::KeyP,
    rdev::Key::KeyQ,
    rdev::Key::KeyR,
    rdev::Key::KeyS,
    rdev::Key::KeyT,
    rdev::Key::KeyU,
    rdev::Key::KeyV,
    rdev::Key::KeyW,
    rdev::Key::KeyX,
    rdev::Key::KeyY,
    rdev::Key::KeyZ,
];

/// Parse a key name from the config into an [`rdev::Key`].
///
/// Case-insensitive.  Supports `F1`–`F12`, single letters and a handful of
/// named keys.
///
/// ```
/// use kegel_coach::hotkey::parse_key;
///
/// assert_eq!(parse_key("F8"),    Some(rdev::Key::F8));
/// assert_eq!(parse_key("space"), Some(rdev::Key::Space));
/// assert_eq!(parse_key("m"),     Some(rdev::Key::KeyM));
/// assert_eq!(parse_key("F13"),   None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    let name = name.trim().to_ascii_lowercase();

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        return n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i)).copied();
    }

    if let [c @ b'a'..=b'z'] = name.as_bytes() {
        return Some(LETTER_KEYS[usize::from(c - b'a')]);
    }

    let key = match name.as_str() {
        "escape" | "esc" => rdev::Key::Escape,
        "space" => rdev::Key::Space,
        "return" | "enter" => rdev::Key::Return,
        "tab" => rdev::Key::Tab,
        "home" => rdev::Key::Home,
        "end" => rdev::Key::End,
        "pageup" => rdev::Key::PageUp,
        "pagedown" => rdev::Key::PageDown,
        "pause" => rdev::Key::Pause,
        "scrolllock" => rdev::Key::ScrollLock,
        "printscreen" => rdev::Key::PrintScreen,
        _ => return None,
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

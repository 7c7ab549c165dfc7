//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Dropping the
//! [`HotkeyListener`] sets a stop flag so events are no longer forwarded,
//! but the thread stays blocked in the rdev event loop until the process
//! exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{HotkeyBindings, HotkeyEvent};

// ---------------------------------------------------------------------------
// KeyFilter
// ---------------------------------------------------------------------------

/// Turns raw press/release events into one [`HotkeyEvent`] per physical
/// press, ignoring OS auto-repeat while a key is held.
#[derive(Debug)]
struct KeyFilter {
    bindings: HotkeyBindings,
    held: Option<rdev::Key>,
}

impl KeyFilter {
    fn new(bindings: HotkeyBindings) -> Self {
        Self {
            bindings,
            held: None,
        }
    }

    fn feed(&mut self, event: &rdev::EventType) -> Option<HotkeyEvent> {
        match *event {
            rdev::EventType::KeyPress(key) => {
                let hotkey = self.bindings.event_for(key)?;
                if self.held == Some(key) {
                    return None;
                }
                self.held = Some(key);
                Some(hotkey)
            }
            rdev::EventType::KeyRelease(key) => {
                if self.held == Some(key) {
                    self.held = None;
                }
                None
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.  Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread.
    ///
    /// Events go out with `try_send` so a stalled UI never blocks the OS
    /// keyboard hook; when the channel is full the press is dropped.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the OS refuses to create the thread.
    pub fn start(
        bindings: HotkeyBindings,
        tx: mpsc::Sender<HotkeyEvent>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut filter = KeyFilter::new(bindings);
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Some(hotkey) = filter.feed(&event.event_type) {
                        log::debug!("hotkey-listener: {hotkey:?}");
                        if let Err(e) = tx.try_send(hotkey) {
                            log::warn!("hotkey-listener: dropped {hotkey:?}: {e}");
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        log::info!(
            "hotkeys: session {:?}, mute {:?}",
            bindings.toggle_session,
            bindings.toggle_mute
        );

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HotkeyConfig;
    use rdev::EventType::{KeyPress, KeyRelease};

    fn filter() -> KeyFilter {
        KeyFilter::new(HotkeyBindings::from_config(&HotkeyConfig::default()).unwrap())
    }

    #[test]
    fn one_event_per_press() {
        let mut f = filter();
        assert_eq!(f.feed(&KeyPress(rdev::Key::F8)), Some(HotkeyEvent::ToggleSession));
        assert_eq!(f.feed(&KeyRelease(rdev::Key::F8)), None);
        assert_eq!(f.feed(&KeyPress(rdev::Key::F7)), Some(HotkeyEvent::ToggleMute));
    }

    #[test]
    fn auto_repeat_is_ignored_until_release() {
        let mut f = filter();
        assert!(f.feed(&KeyPress(rdev::Key::F7)).is_some());
        assert!(f.feed(&KeyPress(rdev::Key::F7)).is_none());
        assert!(f.feed(&KeyPress(rdev::Key::F7)).is_none());
        f.feed(&KeyRelease(rdev::Key::F7));
        assert!(f.feed(&KeyPress(rdev::Key::F7)).is_some());
    }

    #[test]
    fn unbound_keys_pass_through() {
        let mut f = filter();
        assert!(f.feed(&KeyPress(rdev::Key::KeyQ)).is_none());
        assert!(f.feed(&rdev::EventType::MouseMove { x: 1.0, y: 2.0 }).is_none());
    }
}

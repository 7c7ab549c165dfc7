//! Kegel Coach, a breathing-cadence timer for pelvic-floor exercises.
//!
//! | Module       | Role                                                   |
//! |--------------|--------------------------------------------------------|
//! | [`cadence`]  | pure phase/tick state machine                          |
//! | [`session`]  | tokio ticker around the state machine, hold stopwatch  |
//! | [`cue`]      | inhale/exhale sound cues: loading, gating, playback    |
//! | [`visual`]   | circle scale, colours and label for the UI             |
//! | [`history`]  | JSONL session and evaluation logs, daily summaries     |
//! | [`config`]   | `settings.toml` persistence                            |
//! | [`hotkey`]   | global start/stop and mute keys                        |
//! | [`app`]      | egui window                                            |

pub mod app;
pub mod cadence;
pub mod config;
pub mod cue;
pub mod history;
pub mod hotkey;
pub mod session;
pub mod visual;

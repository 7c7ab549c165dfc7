//! Application entry point — Kegel Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Open the cpal output stream, falling back to silence without a device.
//! 5. Spawn the cue loop, which preloads both cue files.
//! 6. Build the [`BreathingTimer`] and the session and evaluation logs.
//! 7. Spawn the hotkey listener thread.
//! 8. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use eframe::egui;
use tokio::sync::mpsc;

use kegel_coach::{
    app::KegelCoachApp,
    config::{AppConfig, AppPaths},
    cue::{
        run_cue_loop, CpalCueOutput, CueLoader, CueOutput, CuePlayer, CueStreamHandle,
        FileCueLoader, SilentOutput,
    },
    history::{EvaluationLog, SessionLog},
    hotkey::{HotkeyBindings, HotkeyEvent, HotkeyListener},
    session::BreathingTimer,
};

/// Cue sample rate when there is no output device to match.
const FALLBACK_SAMPLE_RATE: u32 = 48_000;

// ---------------------------------------------------------------------------
// Cue output
// ---------------------------------------------------------------------------

/// Open the default output device, or fall back to [`SilentOutput`].
///
/// Returns the stream guard (keep it alive on this thread), the output for
/// the cue player, and the sample rate cues must be converted to.
fn open_cue_output(volume: f32) -> (Option<CueStreamHandle>, Box<dyn CueOutput>, u32) {
    match CpalCueOutput::open(volume) {
        Ok((handle, output)) => {
            let rate = output.sample_rate();
            (Some(handle), Box::new(output), rate)
        }
        Err(e) => {
            log::warn!("Audio output unavailable ({e}); cues will be silent");
            (None, Box::new(SilentOutput), FALLBACK_SAMPLE_RATE)
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Kegel Coach")
        .with_inner_size([380.0, 620.0])
        .with_min_inner_size([320.0, 480.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Kegel Coach starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Tokio runtime (ticker, cue loop and blocking decode jobs)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Audio output
    let (_stream_handle, output, target_rate) = open_cue_output(config.cues.volume);

    // 5. Cue loop
    let loader: Arc<dyn CueLoader> = Arc::new(FileCueLoader::new(
        config.cues.resolved_inhale(&paths),
        config.cues.resolved_exhale(&paths),
        target_rate,
    ));
    let (cue_tx, cue_rx) = mpsc::unbounded_channel();
    let player = CuePlayer::new(output, config.cues.start_muted);
    rt.spawn(run_cue_loop(player, loader, cue_tx.clone(), cue_rx));

    // 6. Timer + history
    let timer = BreathingTimer::new(config.timer_options(), cue_tx, rt.handle().clone());
    let history = config.history.enabled.then(|| {
        let log = SessionLog::new(config.history.resolved_log_path(&paths));
        log::info!("Session history: {}", log.path().display());
        log
    });
    let evaluations = config.history.enabled.then(|| {
        let log = EvaluationLog::new(config.history.resolved_evaluations_path(&paths));
        log::info!("Evaluation history: {}", log.path().display());
        log
    });

    // 7. Hotkey listener thread
    let (hotkey_tx, hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let _hotkey_listener = match HotkeyBindings::from_config(&config.hotkey) {
        Ok(bindings) => HotkeyListener::start(bindings, hotkey_tx)
            .map_err(|e| log::warn!("Hotkey listener not started: {e}"))
            .ok(),
        Err(e) => {
            log::warn!("Hotkeys disabled: {e}");
            None
        }
    };

    // 8. Build the egui app and run it (blocks until the window is closed)
    let mut app = KegelCoachApp::new(timer, history, evaluations, hotkey_rx, config.clone());
    let options = native_options(&config);

    eframe::run_native(
        "Kegel Coach",
        options,
        Box::new(move |cc| {
            app.attach(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("window failed: {e}"))?;

    // Dropping the app (and its timer) ends the cue loop; give it a moment.
    rt.shutdown_timeout(std::time::Duration::from_millis(250));
    Ok(())
}

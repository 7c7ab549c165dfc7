//! [`BreathingTimer`]: the cadence controller plus its one-second ticker.
//!
//! # Cancellation
//!
//! The controller lives in a [`SharedTimer`] next to a *generation* counter.
//! Each ticker task remembers the generation it was spawned for and checks
//! it under the same lock before every tick.  `stop()` and `Drop` bump the
//! generation while holding the lock, so once they return no tick can read
//! or write the controller, even if the aborted task has not been reaped yet.
//!
//! # Event flow
//!
//! ```text
//! ticker task ──lock──▶ CadenceController::tick
//!                          │ PhaseEvent
//!                          ├──▶ CueCommand::PhaseEntered (mpsc, in order)
//!                          └──▶ on_phase_change observers
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cadence::{
    CadenceController, CadenceMode, ExerciseType, Phase, PhaseEvent, TimerError, TimerSnapshot,
};
use crate::cue::CueCommand;

/// Nominal tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// TimerOptions
// ---------------------------------------------------------------------------

/// Construction-time settings, usually taken from `AppConfig::timer`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerOptions {
    pub mode: CadenceMode,
    /// Presentation only; never read by the timing path.
    pub exercise_type: ExerciseType,
    pub muted: bool,
}

// ---------------------------------------------------------------------------
// TimerCore / SharedTimer
// ---------------------------------------------------------------------------

type TickObserver = Box<dyn FnMut(u64) + Send>;
type PhaseObserver = Box<dyn FnMut(Phase) + Send>;

/// State guarded by the timer mutex.
pub struct TimerCore {
    controller: CadenceController,
    /// Bumped on every start/stop; a ticker only acts on its own generation.
    generation: u64,
    cues: mpsc::UnboundedSender<CueCommand>,
    tick_observers: Vec<TickObserver>,
    phase_observers: Vec<PhaseObserver>,
}

impl TimerCore {
    fn enter(&mut self, event: PhaseEvent) {
        if self.cues.send(CueCommand::PhaseEntered(event.phase)).is_err() {
            log::debug!("timer: cue player gone, {} not cued", event.phase.label());
        }
        for observer in &mut self.phase_observers {
            observer(event.phase);
        }
    }

    fn tick(&mut self) {
        let Some(outcome) = self.controller.tick() else {
            return;
        };
        for observer in &mut self.tick_observers {
            observer(outcome.elapsed_total);
        }
        if let Some(event) = outcome.entered {
            self.enter(event);
        }
    }
}

/// Thread-safe handle to [`TimerCore`].  Do not hold the lock across
/// `.await` points.
pub type SharedTimer = Arc<Mutex<TimerCore>>;

fn lock(core: &SharedTimer) -> MutexGuard<'_, TimerCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// BreathingTimer
// ---------------------------------------------------------------------------

/// Start/stop facade over the cadence controller.
///
/// ```rust,no_run
/// use kegel_coach::session::{BreathingTimer, TimerOptions};
///
/// # async fn example() {
/// let (cue_tx, _cue_rx) = tokio::sync::mpsc::unbounded_channel();
/// let mut timer = BreathingTimer::new(
///     TimerOptions::default(),
///     cue_tx,
///     tokio::runtime::Handle::current(),
/// );
/// timer.on_tick(|secs| println!("{secs} s"));
/// timer.start().unwrap();
/// # }
/// ```
pub struct BreathingTimer {
    core: SharedTimer,
    ticker: Option<JoinHandle<()>>,
    runtime: Handle,
    /// Applied at the next `start()`.
    mode: CadenceMode,
    exercise_type: ExerciseType,
    muted: bool,
    shut_down: bool,
}

impl BreathingTimer {
    /// Create an inactive timer.
    ///
    /// * `cues`    — sender feeding the cue loop; receives every phase entry
    ///   and mute change.
    /// * `runtime` — where the ticker task is spawned.
    pub fn new(
        options: TimerOptions,
        cues: mpsc::UnboundedSender<CueCommand>,
        runtime: Handle,
    ) -> Self {
        let core = TimerCore {
            controller: CadenceController::new(),
            generation: 0,
            cues,
            tick_observers: Vec::new(),
            phase_observers: Vec::new(),
        };

        Self {
            core: Arc::new(Mutex::new(core)),
            ticker: None,
            runtime,
            mode: options.mode,
            exercise_type: options.exercise_type,
            muted: options.muted,
            shut_down: false,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin a session at the selected mode's cadence.
    ///
    /// The inhale cue is requested immediately; the first tick lands one
    /// second later.
    ///
    /// # Errors
    ///
    /// [`TimerError::AlreadyActive`]; the running session and its ticker
    /// are untouched.  [`TimerError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.shut_down {
            log::warn!("timer: start ignored: {}", TimerError::ShutDown);
            return Err(TimerError::ShutDown);
        }
        let generation = {
            let mut core = lock(&self.core);
            let entered = core.controller.activate(self.mode.into()).map_err(|e| {
                log::warn!("timer: start ignored: {e}");
                e
            })?;
            core.generation += 1;
            core.enter(entered);
            core.generation
        };

        if let Some(stale) = self.ticker.take() {
            stale.abort();
        }
        self.ticker = Some(
            self.runtime
                .spawn(run_ticker(Arc::clone(&self.core), generation, TICK_PERIOD)),
        );

        log::info!(
            "timer: started ({} mode, {} s per phase, {})",
            self.mode,
            self.mode.seconds_per_phase(),
            self.exercise_type
        );
        Ok(())
    }

    /// End the session.  No tick is observable after this returns.
    ///
    /// Returns the session length in whole seconds.
    ///
    /// # Errors
    ///
    /// [`TimerError::NotActive`].
    pub fn stop(&mut self) -> Result<u64, TimerError> {
        let elapsed = {
            let mut core = lock(&self.core);
            core.controller.deactivate().map_err(|e| {
                log::warn!("timer: stop ignored: {e}");
                e
            })?;
            core.generation += 1;
            core.controller.snapshot().elapsed_total
        };

        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        log::info!("timer: stopped after {elapsed} s");
        Ok(elapsed)
    }

    pub fn is_active(&self) -> bool {
        lock(&self.core).controller.is_active()
    }

    /// Current phase, progress and cadence.
    ///
    /// While inactive `seconds_per_phase` reports the cadence the next
    /// session will use.
    pub fn snapshot(&self) -> TimerSnapshot {
        let mut snap = lock(&self.core).controller.snapshot();
        if !snap.active {
            snap.seconds_per_phase = self.mode.seconds_per_phase();
        }
        snap
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> CadenceMode {
        self.mode
    }

    /// Select the cadence for the next session.
    ///
    /// # Errors
    ///
    /// [`TimerError::ModeLocked`] while a session is running.
    pub fn set_mode(&mut self, mode: CadenceMode) -> Result<(), TimerError> {
        if self.is_active() {
            return Err(TimerError::ModeLocked);
        }
        self.mode = mode;
        Ok(())
    }

    pub fn exercise_type(&self) -> ExerciseType {
        self.exercise_type
    }

    pub fn set_exercise_type(&mut self, exercise_type: ExerciseType) {
        self.exercise_type = exercise_type;
    }

    // -----------------------------------------------------------------------
    // Mute
    // -----------------------------------------------------------------------

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Forward a mute change to the cue player.  Timing is unaffected.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        let core = lock(&self.core);
        if core.cues.send(CueCommand::SetMuted(muted)).is_err() {
            log::debug!("timer: cue player gone, mute change dropped");
        }
    }

    /// Flip the mute state and return the new value.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.muted;
        self.set_muted(muted);
        muted
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Called with the session's total elapsed seconds after every tick.
    ///
    /// Observers run on the ticker task while the timer lock is held; they
    /// must not call back into the timer.
    pub fn on_tick(&mut self, observer: impl FnMut(u64) + Send + 'static) {
        lock(&self.core).tick_observers.push(Box::new(observer));
    }

    /// Called with every phase entered, including the initial `Inhale`.
    /// Same threading rules as [`on_tick`](Self::on_tick).
    pub fn on_phase_change(&mut self, observer: impl FnMut(Phase) + Send + 'static) {
        lock(&self.core).phase_observers.push(Box::new(observer));
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// End any running session, cancel the ticker and tell the cue player
    /// to release its resources.  Does not require `stop()` first.
    /// Idempotent; the timer cannot be started again.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let mut core = lock(&self.core);
        core.generation += 1;
        if core.controller.is_active() {
            let _ = core.controller.deactivate();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let _ = core.cues.send(CueCommand::Teardown);
        log::debug!("timer: shut down");
    }
}

impl Drop for BreathingTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Ticker task
// ---------------------------------------------------------------------------

/// Tick `core` every `period` until its generation moves on.
async fn run_ticker(core: SharedTimer, generation: u64, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        interval.tick().await;

        let mut guard = lock(&core);
        if guard.generation != generation {
            break;
        }
        guard.tick();
    }

    log::debug!("timer: ticker for generation {generation} exited");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn timer(mode: CadenceMode) -> (BreathingTimer, mpsc::UnboundedReceiver<CueCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let options = TimerOptions {
            mode,
            ..TimerOptions::default()
        };
        (BreathingTimer::new(options, tx, Handle::current()), rx)
    }

    /// Let the paused clock run past `millis` so every tick due before it
    /// has been processed.
    async fn run_for(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    fn drain_phases(rx: &mut mpsc::UnboundedReceiver<CueCommand>) -> Vec<Phase> {
        let mut phases = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            if let CueCommand::PhaseEntered(phase) = cmd {
                phases.push(phase);
            }
        }
        phases
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn start_cues_inhale_immediately() {
        let (mut timer, mut rx) = timer(CadenceMode::Normal);
        timer.start().unwrap();
        assert_eq!(drain_phases(&mut rx), vec![Phase::Inhale]);
        assert!(timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn normal_mode_flips_at_five_and_ten_seconds() {
        let (mut timer, mut rx) = timer(CadenceMode::Normal);
        timer.start().unwrap();

        run_for(4_500).await;
        let snap = timer.snapshot();
        assert_eq!((snap.phase, snap.elapsed_in_phase), (Phase::Inhale, 4));

        run_for(1_000).await;
        let snap = timer.snapshot();
        assert_eq!((snap.phase, snap.elapsed_in_phase), (Phase::Exhale, 0));

        run_for(5_000).await;
        assert_eq!(timer.snapshot().phase, Phase::Inhale);
        assert_eq!(
            drain_phases(&mut rx),
            vec![Phase::Inhale, Phase::Exhale, Phase::Inhale]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_ticks_synchronously() {
        let (mut timer, mut rx) = timer(CadenceMode::Normal);
        timer.start().unwrap();
        run_for(2_500).await;

        assert_eq!(timer.stop().unwrap(), 2);
        let after_stop = timer.snapshot();
        assert_eq!((after_stop.phase, after_stop.elapsed_in_phase), (Phase::Inhale, 0));

        run_for(20_000).await;
        assert_eq!(timer.snapshot(), after_stop);
        assert_eq!(drain_phases(&mut rx), vec![Phase::Inhale]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_cannot_tick() {
        let (mut timer, _rx) = timer(CadenceMode::Fast);
        timer.start().unwrap();
        let stale = lock(&timer.core).generation;
        timer.stop().unwrap();
        timer.start().unwrap();

        // A leftover ticker from the first session exits on its first tick.
        let leftover = tokio::spawn(run_ticker(Arc::clone(&timer.core), stale, TICK_PERIOD));
        run_for(1_500).await;
        assert!(leftover.is_finished());
        assert_eq!(timer.snapshot().elapsed_total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_single_ticker() {
        let (mut timer, _rx) = timer(CadenceMode::Normal);
        timer.start().unwrap();
        run_for(1_500).await;

        assert_eq!(timer.start(), Err(TimerError::AlreadyActive));
        run_for(2_000).await;
        assert_eq!(timer.snapshot().elapsed_total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_inactive_is_rejected() {
        let (mut timer, _rx) = timer(CadenceMode::Normal);
        assert_eq!(timer.stop(), Err(TimerError::NotActive));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reproduces_initial_state() {
        let (mut timer, mut rx) = timer(CadenceMode::Fast);
        timer.start().unwrap();
        run_for(3_500).await;
        timer.stop().unwrap();
        drain_phases(&mut rx);

        timer.start().unwrap();
        let snap = timer.snapshot();
        assert_eq!((snap.phase, snap.elapsed_in_phase, snap.elapsed_total), (Phase::Inhale, 0, 0));
        assert_eq!(drain_phases(&mut rx), vec![Phase::Inhale]);
    }

    // -----------------------------------------------------------------------
    // Mode
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn mode_change_is_locked_while_active() {
        let (mut timer, _rx) = timer(CadenceMode::Normal);
        timer.start().unwrap();
        assert_eq!(timer.set_mode(CadenceMode::VeryFast), Err(TimerError::ModeLocked));
        assert_eq!(timer.snapshot().seconds_per_phase, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_change_while_inactive_applies_next_start() {
        let (mut timer, mut rx) = timer(CadenceMode::Normal);
        timer.set_mode(CadenceMode::VeryFast).unwrap();
        assert_eq!(timer.snapshot().seconds_per_phase, 1);

        timer.start().unwrap();
        run_for(2_500).await;
        assert_eq!(
            drain_phases(&mut rx),
            vec![Phase::Inhale, Phase::Exhale, Phase::Inhale]
        );
    }

    // -----------------------------------------------------------------------
    // Mute and observers
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn mute_is_forwarded_and_leaves_timing_alone() {
        let (mut timer, mut rx) = timer(CadenceMode::Fast);
        timer.start().unwrap();
        run_for(1_500).await;
        let before = timer.snapshot();

        assert!(timer.toggle_mute());
        assert!(timer.is_muted());
        assert_eq!(timer.snapshot(), before);

        let muted: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|cmd| match cmd {
                CueCommand::SetMuted(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(muted, vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn observers_see_ticks_and_phases() {
        let (mut timer, _rx) = timer(CadenceMode::Fast);
        let total = Arc::new(AtomicU64::new(0));
        let phases = Arc::new(Mutex::new(Vec::new()));

        let total_obs = Arc::clone(&total);
        timer.on_tick(move |secs| total_obs.store(secs, Ordering::SeqCst));
        let phases_obs = Arc::clone(&phases);
        timer.on_phase_change(move |p| phases_obs.lock().unwrap().push(p));

        timer.start().unwrap();
        run_for(4_500).await;

        assert_eq!(total.load(Ordering::SeqCst), 4);
        assert_eq!(
            *phases.lock().unwrap(),
            vec![Phase::Inhale, Phase::Exhale, Phase::Inhale]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cue_player_gone_does_not_stop_timing() {
        let (mut timer, rx) = timer(CadenceMode::VeryFast);
        drop(rx);
        timer.start().unwrap();
        run_for(3_500).await;
        assert_eq!(timer.snapshot().elapsed_total, 3);
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_ticker_and_tears_down_cues() {
        let (mut timer, mut rx) = timer(CadenceMode::VeryFast);
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_obs = Arc::clone(&ticks);
        timer.on_tick(move |_| {
            ticks_obs.fetch_add(1, Ordering::SeqCst);
        });
        timer.start().unwrap();
        run_for(1_500).await;

        drop(timer);
        run_for(5_000).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        let last = std::iter::from_fn(|| rx.try_recv().ok()).last();
        assert!(matches!(last, Some(CueCommand::Teardown)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_session_and_refuses_restart() {
        let (mut timer, mut rx) = timer(CadenceMode::VeryFast);
        timer.start().unwrap();
        run_for(1_500).await;

        timer.shutdown();
        assert!(!timer.is_active());
        assert_eq!(timer.start(), Err(TimerError::ShutDown));
        timer.shutdown();

        run_for(3_000).await;
        assert!(!timer.is_active());
        drop(timer);

        let cmds: Vec<CueCommand> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let teardowns = cmds
            .iter()
            .filter(|c| matches!(c, CueCommand::Teardown))
            .count();
        assert_eq!(teardowns, 1);
        assert!(matches!(cmds.last(), Some(CueCommand::Teardown)));
    }
}

//! Cue player. Owns the two cue resources and the single playback slot.
//!
//! # Gating rule
//!
//! A phase entry produces sound iff **both** cues are loaded **and** the
//! player is not muted.  Entries that fail the rule are dropped, never
//! queued.
//!
//! # Resource lifecycle
//!
//! ```text
//! Idle ──preload()──▶ Loading ──Ok──▶ Ready
//!                        └────Err──▶ Failed   (cueing disabled for good)
//! any ──teardown()──▶ Idle  (clips released, pending loads aborted)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cadence::Phase;

use super::{CueClip, CueError, CueKind, CueLoader, CueOutput};

// ---------------------------------------------------------------------------
// CueCommand
// ---------------------------------------------------------------------------

/// Messages consumed by [`run_cue_loop`].
#[derive(Debug)]
pub enum CueCommand {
    /// The timer entered `Phase`.
    PhaseEntered(Phase),
    /// Mute toggle from the UI or a hotkey.
    SetMuted(bool),
    /// A preload task finished.
    Loaded {
        kind: CueKind,
        result: Result<CueClip, CueError>,
    },
    /// Stop playback, release everything and end the loop.
    Teardown,
}

// ---------------------------------------------------------------------------
// CueOutcome
// ---------------------------------------------------------------------------

/// What happened to a phase entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CueOutcome {
    Played(CueKind),
    /// Dropped: the cues are not (or never will be) both loaded.
    NotReady,
    /// Dropped: muted.
    Muted,
    /// The output refused to start; logged, nothing else changes.
    Failed(CueError),
}

// ---------------------------------------------------------------------------
// CueResource
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum ResourceState {
    Idle,
    Loading,
    Ready(CueClip),
    Failed,
}

#[derive(Debug)]
struct CueResource {
    kind: CueKind,
    state: ResourceState,
}

impl CueResource {
    fn new(kind: CueKind) -> Self {
        Self {
            kind,
            state: ResourceState::Idle,
        }
    }

    fn clip(&self) -> Option<&CueClip> {
        match &self.state {
            ResourceState::Ready(clip) => Some(clip),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CuePlayer
// ---------------------------------------------------------------------------

/// Plays the matching cue once per phase entry.
///
/// Generic over the [`CueOutput`] so tests can substitute a recording double
/// for the cpal stream.
pub struct CuePlayer<O: CueOutput> {
    inhale: CueResource,
    exhale: CueResource,
    /// The playback slot: the cue most recently started and not halted.
    current: Option<CueKind>,
    muted: bool,
    ready: bool,
    torn_down: bool,
    loads: Vec<JoinHandle<()>>,
    output: O,
}

impl<O: CueOutput> CuePlayer<O> {
    pub fn new(output: O, muted: bool) -> Self {
        Self {
            inhale: CueResource::new(CueKind::Inhale),
            exhale: CueResource::new(CueKind::Exhale),
            current: None,
            muted,
            ready: false,
            torn_down: false,
            loads: Vec::new(),
            output,
        }
    }

    fn resource(&self, kind: CueKind) -> &CueResource {
        match kind {
            CueKind::Inhale => &self.inhale,
            CueKind::Exhale => &self.exhale,
        }
    }

    fn resource_mut(&mut self, kind: CueKind) -> &mut CueResource {
        match kind {
            CueKind::Inhale => &mut self.inhale,
            CueKind::Exhale => &mut self.exhale,
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Start loading every cue that has not been requested yet.
    ///
    /// Each load runs as its own tokio task and reports back through
    /// `completions` as [`CueCommand::Loaded`].  Calling this again while
    /// loads are pending (or finished) starts nothing new.  Must be called
    /// from within a tokio runtime.
    ///
    /// Returns the number of loads started.
    pub fn preload(
        &mut self,
        loader: Arc<dyn CueLoader>,
        completions: mpsc::UnboundedSender<CueCommand>,
    ) -> usize {
        if self.torn_down {
            log::warn!("cue: preload after teardown ignored");
            return 0;
        }

        let mut started = 0;
        for kind in [CueKind::Inhale, CueKind::Exhale] {
            let resource = self.resource_mut(kind);
            if !matches!(resource.state, ResourceState::Idle) {
                continue;
            }
            resource.state = ResourceState::Loading;

            let loader = Arc::clone(&loader);
            let tx = completions.clone();
            self.loads.push(tokio::spawn(async move {
                let result = loader.load(kind).await;
                let _ = tx.send(CueCommand::Loaded { kind, result });
            }));
            started += 1;
        }

        if started > 0 {
            log::debug!("cue: preloading {started} cue(s)");
        }
        started
    }

    /// Record a finished load.
    ///
    /// Returns `true` only on the call that makes both cues ready.
    /// Completions for a resource that is not loading (duplicates, or
    /// anything arriving after teardown) are ignored.
    pub fn complete_load(&mut self, kind: CueKind, result: Result<CueClip, CueError>) -> bool {
        let resource = self.resource_mut(kind);
        if !matches!(resource.state, ResourceState::Loading) {
            log::debug!("cue: ignoring stale {} load", kind.as_str());
            return false;
        }

        match result {
            Ok(clip) => {
                log::info!(
                    "cue: {} loaded ({:.2} s)",
                    resource.kind.as_str(),
                    clip.duration_secs()
                );
                resource.state = ResourceState::Ready(clip);
            }
            Err(e) => {
                log::warn!(
                    "cue: {} failed to load ({e}); audio cues disabled",
                    resource.kind.as_str()
                );
                resource.state = ResourceState::Failed;
            }
        }

        if !self.ready && self.inhale.clip().is_some() && self.exhale.clip().is_some() {
            self.ready = true;
            log::info!("cue: both cues ready");
            return true;
        }
        false
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// React to a phase entry.
    pub fn on_phase_entered(&mut self, phase: Phase) -> CueOutcome {
        if !self.ready {
            log::debug!("cue: {} dropped, cues not ready", phase.label());
            return CueOutcome::NotReady;
        }
        if self.muted {
            return CueOutcome::Muted;
        }

        let kind = CueKind::from(phase);
        let Some(clip) = self.resource(kind).clip().cloned() else {
            return CueOutcome::NotReady;
        };

        if self.current.take().is_some() {
            self.output.halt();
        }

        match self.output.start(&clip) {
            Ok(()) => {
                self.current = Some(kind);
                CueOutcome::Played(kind)
            }
            Err(e) => {
                log::warn!("cue: could not play {}: {e}", kind.as_str());
                CueOutcome::Failed(e)
            }
        }
    }

    /// Mute or unmute.  Muting halts whatever is sounding.
    pub fn set_muted(&mut self, muted: bool) {
        if muted && self.current.take().is_some() {
            self.output.halt();
        }
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// The cue that is audibly playing right now, if any.
    pub fn playing(&self) -> Option<CueKind> {
        self.current.filter(|_| self.output.is_playing())
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Halt playback, abort pending loads and release both clips.
    ///
    /// Idempotent, and safe whether or not preloading ever finished.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for handle in self.loads.drain(..) {
            handle.abort();
        }
        if self.current.take().is_some() {
            self.output.halt();
        }
        self.inhale.state = ResourceState::Idle;
        self.exhale.state = ResourceState::Idle;
        self.ready = false;

        log::debug!("cue: torn down");
    }
}

impl<O: CueOutput> Drop for CuePlayer<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ---------------------------------------------------------------------------
// run_cue_loop
// ---------------------------------------------------------------------------

/// Drive `player` from `commands` until [`CueCommand::Teardown`] arrives or
/// every sender is gone.
///
/// `commands_tx` must feed `commands`; preload completions are routed
/// through it so every state change happens on this task.
pub async fn run_cue_loop<O: CueOutput>(
    mut player: CuePlayer<O>,
    loader: Arc<dyn CueLoader>,
    commands_tx: mpsc::UnboundedSender<CueCommand>,
    mut commands: mpsc::UnboundedReceiver<CueCommand>,
) {
    player.preload(loader, commands_tx);

    while let Some(cmd) = commands.recv().await {
        match cmd {
            CueCommand::PhaseEntered(phase) => {
                player.on_phase_entered(phase);
            }
            CueCommand::SetMuted(muted) => player.set_muted(muted),
            CueCommand::Loaded { kind, result } => {
                player.complete_load(kind, result);
            }
            CueCommand::Teardown => break,
        }
    }

    player.teardown();
    log::info!("cue: loop finished");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    #[derive(Debug, Default)]
    struct OutputLog {
        started: Vec<CueKind>,
        halts: usize,
        sounding: Option<CueKind>,
        /// Highest number of simultaneously sounding cues ever observed.
        max_concurrent: usize,
    }

    /// Records every start/halt; shares its log so tests can inspect it
    /// after the player has been moved.
    #[derive(Clone, Default)]
    struct RecordingOutput {
        log: Arc<Mutex<OutputLog>>,
        fail: bool,
    }

    impl CueOutput for RecordingOutput {
        fn start(&mut self, clip: &CueClip) -> Result<(), CueError> {
            if self.fail {
                return Err(CueError::Playback("autoplay rejected".into()));
            }
            let mut log = self.log.lock().unwrap();
            let concurrent = usize::from(log.sounding.is_some()) + 1;
            log.max_concurrent = log.max_concurrent.max(concurrent);
            log.started.push(clip.kind);
            log.sounding = Some(clip.kind);
            Ok(())
        }

        fn halt(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.halts += 1;
            log.sounding = None;
        }

        fn is_playing(&self) -> bool {
            self.log.lock().unwrap().sounding.is_some()
        }
    }

    /// Loader that answers instantly and counts calls per kind.
    struct MockLoader {
        calls: AtomicUsize,
        fail_exhale: bool,
    }

    impl MockLoader {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_exhale: false,
            })
        }

        fn failing_exhale() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_exhale: true,
            })
        }
    }

    #[async_trait]
    impl CueLoader for MockLoader {
        async fn load(&self, kind: CueKind) -> Result<CueClip, CueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_exhale && kind == CueKind::Exhale {
                return Err(CueError::Decode("corrupt frame".into()));
            }
            Ok(clip(kind))
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn clip(kind: CueKind) -> CueClip {
        CueClip::new(kind, vec![0.1; 480], 48_000)
    }

    fn ready_player(output: RecordingOutput) -> CuePlayer<RecordingOutput> {
        let mut player = CuePlayer::new(output, false);
        player.inhale.state = ResourceState::Loading;
        player.exhale.state = ResourceState::Loading;
        player.complete_load(CueKind::Inhale, Ok(clip(CueKind::Inhale)));
        assert!(player.complete_load(CueKind::Exhale, Ok(clip(CueKind::Exhale))));
        player
    }

    // -----------------------------------------------------------------------
    // Preloading
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn preload_twice_loads_each_cue_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let loader = MockLoader::ok();
        let mut player = CuePlayer::new(RecordingOutput::default(), false);

        assert_eq!(player.preload(loader.clone(), tx.clone()), 2);
        assert_eq!(player.preload(loader.clone(), tx.clone()), 0);

        let mut ready_transitions = 0;
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                CueCommand::Loaded { kind, result } => {
                    if player.complete_load(kind, result) {
                        ready_transitions += 1;
                    }
                }
                other => panic!("unexpected command {other:?}"),
            }
        }

        assert_eq!(ready_transitions, 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert!(player.is_ready());
    }

    #[test]
    fn duplicate_completion_does_not_fire_ready_again() {
        let mut player = ready_player(RecordingOutput::default());
        assert!(!player.complete_load(CueKind::Exhale, Ok(clip(CueKind::Exhale))));
        assert!(player.is_ready());
    }

    #[test]
    fn one_loaded_cue_is_not_ready() {
        let mut player = CuePlayer::new(RecordingOutput::default(), false);
        player.inhale.state = ResourceState::Loading;
        player.exhale.state = ResourceState::Loading;
        assert!(!player.complete_load(CueKind::Inhale, Ok(clip(CueKind::Inhale))));
        assert!(!player.is_ready());
    }

    #[tokio::test]
    async fn failed_load_disables_cueing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = RecordingOutput::default();
        let mut player = CuePlayer::new(output.clone(), false);
        player.preload(MockLoader::failing_exhale(), tx);

        for _ in 0..2 {
            if let Some(CueCommand::Loaded { kind, result }) = rx.recv().await {
                assert!(!player.complete_load(kind, result));
            }
        }

        assert!(!player.is_ready());
        assert_eq!(player.on_phase_entered(Phase::Inhale), CueOutcome::NotReady);
        assert!(output.log.lock().unwrap().started.is_empty());
    }

    #[test]
    fn phase_entry_before_ready_records_no_playback() {
        let output = RecordingOutput::default();
        let mut player = CuePlayer::new(output.clone(), false);
        player.inhale.state = ResourceState::Loading;
        player.exhale.state = ResourceState::Loading;

        assert_eq!(player.on_phase_entered(Phase::Inhale), CueOutcome::NotReady);
        assert!(output.log.lock().unwrap().started.is_empty());

        // Dropped, not queued: becoming ready later plays nothing by itself.
        player.complete_load(CueKind::Inhale, Ok(clip(CueKind::Inhale)));
        player.complete_load(CueKind::Exhale, Ok(clip(CueKind::Exhale)));
        assert!(output.log.lock().unwrap().started.is_empty());
    }

    // -----------------------------------------------------------------------
    // Playback slot
    // -----------------------------------------------------------------------

    #[test]
    fn plays_matching_cue() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());

        assert_eq!(
            player.on_phase_entered(Phase::Inhale),
            CueOutcome::Played(CueKind::Inhale)
        );
        assert_eq!(
            player.on_phase_entered(Phase::Exhale),
            CueOutcome::Played(CueKind::Exhale)
        );
        assert_eq!(
            output.log.lock().unwrap().started,
            vec![CueKind::Inhale, CueKind::Exhale]
        );
    }

    #[test]
    fn new_cue_preempts_current_one() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());

        for phase in [Phase::Inhale, Phase::Exhale, Phase::Inhale, Phase::Exhale] {
            player.on_phase_entered(phase);
        }

        {
            let log = output.log.lock().unwrap();
            assert_eq!(log.max_concurrent, 1);
            assert_eq!(log.halts, 3);
        }
        assert_eq!(player.playing(), Some(CueKind::Exhale));
    }

    #[test]
    fn playback_failure_is_reported_and_not_fatal() {
        let output = RecordingOutput {
            fail: true,
            ..Default::default()
        };
        let mut player = ready_player(output);

        let outcome = player.on_phase_entered(Phase::Inhale);
        assert!(matches!(outcome, CueOutcome::Failed(CueError::Playback(_))));
        assert_eq!(player.playing(), None);
        // Next attempt is made normally.
        assert!(matches!(
            player.on_phase_entered(Phase::Exhale),
            CueOutcome::Failed(_)
        ));
    }

    // -----------------------------------------------------------------------
    // Mute
    // -----------------------------------------------------------------------

    #[test]
    fn muted_player_never_starts_playback() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());
        player.set_muted(true);

        for phase in [Phase::Inhale, Phase::Exhale, Phase::Inhale] {
            assert_eq!(player.on_phase_entered(phase), CueOutcome::Muted);
        }
        assert!(output.log.lock().unwrap().started.is_empty());
    }

    #[test]
    fn muting_while_exhale_plays_halts_immediately() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());
        player.on_phase_entered(Phase::Exhale);
        assert_eq!(player.playing(), Some(CueKind::Exhale));

        player.set_muted(true);

        assert_eq!(player.playing(), None);
        assert!(!output.is_playing());
        assert_eq!(output.log.lock().unwrap().halts, 1);
    }

    #[test]
    fn unmute_resumes_with_next_phase_only() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());
        player.set_muted(true);
        player.on_phase_entered(Phase::Inhale);
        player.set_muted(false);

        assert!(output.log.lock().unwrap().started.is_empty());
        assert_eq!(
            player.on_phase_entered(Phase::Exhale),
            CueOutcome::Played(CueKind::Exhale)
        );
    }

    #[test]
    fn muting_does_not_touch_readiness() {
        let mut player = ready_player(RecordingOutput::default());
        player.set_muted(true);
        player.set_muted(false);
        assert!(player.is_ready());
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    #[test]
    fn teardown_before_preload_is_safe() {
        let mut player = CuePlayer::new(RecordingOutput::default(), false);
        player.teardown();
        player.teardown();
        assert!(!player.is_ready());
    }

    #[test]
    fn teardown_halts_and_releases() {
        let output = RecordingOutput::default();
        let mut player = ready_player(output.clone());
        player.on_phase_entered(Phase::Inhale);

        player.teardown();

        assert!(!output.is_playing());
        assert!(!player.is_ready());
        assert_eq!(player.on_phase_entered(Phase::Exhale), CueOutcome::NotReady);
    }

    #[tokio::test]
    async fn completions_after_teardown_are_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = CuePlayer::new(RecordingOutput::default(), false);
        player.preload(MockLoader::ok(), tx.clone());
        player.teardown();

        assert!(!player.complete_load(CueKind::Inhale, Ok(clip(CueKind::Inhale))));
        assert!(!player.complete_load(CueKind::Exhale, Ok(clip(CueKind::Exhale))));
        assert!(!player.is_ready());
        assert_eq!(player.preload(MockLoader::ok(), tx), 0);
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn loop_plays_after_preload_and_stops_on_teardown() {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = RecordingOutput::default();
        let player = CuePlayer::new(output.clone(), false);
        let task = tokio::spawn(run_cue_loop(player, MockLoader::ok(), tx.clone(), rx));

        // Wait until both cues have loaded.
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        tx.send(CueCommand::PhaseEntered(Phase::Inhale)).unwrap();
        tx.send(CueCommand::SetMuted(true)).unwrap();
        tx.send(CueCommand::PhaseEntered(Phase::Exhale)).unwrap();
        tx.send(CueCommand::Teardown).unwrap();
        task.await.unwrap();

        let log = output.log.lock().unwrap();
        assert_eq!(log.started, vec![CueKind::Inhale]);
        assert!(log.sounding.is_none());
    }
}

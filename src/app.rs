//! Kegel Coach window — egui/eframe application.
//!
//! # Architecture
//!
//! [`KegelCoachApp`] is the top-level [`eframe::App`].  It owns the
//! [`BreathingTimer`] and drives it from button clicks and from
//! [`HotkeyEvent`]s drained each frame.  Everything it draws comes from
//! [`BreathingTimer::snapshot`] passed through the presentation adapter in
//! [`crate::visual`].
//!
//! The timer's tick and phase observers request a repaint, so the window
//! only redraws when something changes (or while the circle is animating).
//!
//! # Layout
//!
//! A tab row switches between the breathing view and the strength
//! evaluation.
//!
//! | Row            | Content                                        |
//! |----------------|------------------------------------------------|
//! | circle         | breathing circle with the action label         |
//! | clock          | `m:ss` session time                            |
//! | selectors      | mode + exercise type (disabled while active)   |
//! | controls       | Start/Stop, Mute/Unmute                        |
//! | footer         | status line, today's total and its breakdown   |
//!
//! The evaluation view shows the hold clock, Start/Release, a notes box,
//! personal best, average and the latest results.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use tokio::sync::mpsc;

use crate::cadence::{CadenceMode, ExerciseType};
use crate::config::AppConfig;
use crate::history::{
    daily_summaries, encouragement, format_clock, DailySummary, EvaluationLog, EvaluationRecord,
    EvaluationStats, SessionLog, SessionRecord,
};
use crate::hotkey::HotkeyEvent;
use crate::session::{BreathingTimer, HoldTimer};
use crate::visual::{CircleAnimator, CircleView};

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(4);
/// Gap between the background disc and the breathing circle at scale 1.0.
const CIRCLE_INSET: f32 = 16.0;

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Breathe,
    Evaluate,
}

#[derive(Debug, Clone)]
struct Status {
    text: String,
    kind: StatusKind,
    shown_at: Instant,
}

// ---------------------------------------------------------------------------
// KegelCoachApp
// ---------------------------------------------------------------------------

/// eframe application — the breathing coach window.
pub struct KegelCoachApp {
    timer: BreathingTimer,
    animator: CircleAnimator,

    /// Wall-clock start of the running session, for the history record.
    session_started: Option<DateTime<Utc>>,
    /// `None` when history is disabled in the config.
    history: Option<SessionLog>,
    today: Option<DailySummary>,
    status: Option<Status>,

    view: View,
    hold: HoldTimer,
    /// Notes typed for the next evaluation.
    notes: String,
    evaluations: Option<EvaluationLog>,
    evaluation_stats: EvaluationStats,

    hotkey_rx: mpsc::Receiver<HotkeyEvent>,
    config: AppConfig,
}

impl KegelCoachApp {
    /// * `timer`     — inactive timer wired to the cue loop.
    /// * `history`   — session log, or `None` to record nothing.
    /// * `evaluations` — evaluation log, or `None` to record nothing.
    /// * `hotkey_rx` — receiver end of the hotkey channel.
    pub fn new(
        timer: BreathingTimer,
        history: Option<SessionLog>,
        evaluations: Option<EvaluationLog>,
        hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        config: AppConfig,
    ) -> Self {
        let mut app = Self {
            timer,
            animator: CircleAnimator::new(Instant::now()),
            session_started: None,
            history,
            today: None,
            status: None,
            view: View::Breathe,
            hold: HoldTimer::new(),
            notes: String::new(),
            evaluations,
            evaluation_stats: EvaluationStats::default(),
            hotkey_rx,
            config,
        };
        app.refresh_today();
        app.refresh_evaluations();
        app
    }

    /// Repaint on every tick and phase change.  Call once the egui context
    /// exists.
    pub fn attach(&mut self, ctx: &egui::Context) {
        let on_tick = ctx.clone();
        self.timer.on_tick(move |_| on_tick.request_repaint());
        let on_phase = ctx.clone();
        self.timer.on_phase_change(move |_| on_phase.request_repaint());
    }

    // ── Session control ──────────────────────────────────────────────────

    fn toggle_session(&mut self) {
        if self.timer.is_active() {
            self.stop_session();
        } else {
            self.start_session();
        }
    }

    fn start_session(&mut self) {
        if self.hold.is_holding() {
            self.set_status("Release the evaluation hold first".into(), StatusKind::Error);
            return;
        }
        match self.timer.start() {
            Ok(()) => {
                self.session_started = Some(Utc::now());
                self.status = None;
            }
            Err(e) => self.set_status(e.to_string(), StatusKind::Error),
        }
    }

    fn stop_session(&mut self) {
        match self.timer.stop() {
            Ok(secs) => self.record_session(secs),
            Err(e) => self.set_status(e.to_string(), StatusKind::Error),
        }
    }

    fn toggle_mute(&mut self) {
        let muted = self.timer.toggle_mute();
        log::info!("cues {}", if muted { "muted" } else { "unmuted" });
    }

    /// Append the finished session to the log and refresh today's total.
    fn record_session(&mut self, secs: u64) {
        let Some(started_at) = self.session_started.take() else {
            return;
        };
        let Some(log) = &self.history else {
            return;
        };
        let Some(record) = SessionRecord::finished(
            started_at,
            secs,
            self.timer.mode(),
            self.timer.exercise_type(),
        ) else {
            log::debug!("session of {secs} s not recorded");
            return;
        };

        match log.append(&record) {
            Ok(()) => {
                self.set_status(
                    format!("Saved {} session", format_clock(secs)),
                    StatusKind::Info,
                );
                self.refresh_today();
            }
            Err(e) => {
                log::error!("failed to save session: {e}");
                self.set_status("Could not save session".into(), StatusKind::Error);
            }
        }
    }

    fn refresh_today(&mut self) {
        let Some(log) = &self.history else {
            return;
        };
        let today = Local::now().date_naive();
        self.today = match log.load() {
            Ok(records) => daily_summaries(&records)
                .into_iter()
                .find(|d| d.date == today),
            Err(e) => {
                log::warn!("failed to read session history: {e}");
                None
            }
        };
    }

    // ── Evaluation ───────────────────────────────────────────────────────

    fn start_hold(&mut self) {
        if self.timer.is_active() {
            self.set_status("Stop the breathing session first".into(), StatusKind::Error);
            return;
        }
        if self.hold.start(Instant::now()) {
            self.status = None;
        }
    }

    fn release_hold(&mut self) {
        if let Some(secs) = self.hold.release(Instant::now()) {
            self.record_evaluation(secs);
        }
    }

    /// Append the hold to the evaluation log and refresh the statistics.
    fn record_evaluation(&mut self, secs: u64) {
        let Some(log) = &self.evaluations else {
            return;
        };
        let Some(record) = EvaluationRecord::finished(Utc::now(), secs, &self.notes) else {
            log::debug!("hold of {secs} s not recorded");
            return;
        };
        let new_best = self.evaluation_stats.is_new_best(secs);

        match log.append(&record) {
            Ok(()) => {
                let text = if new_best {
                    format!("New personal best: {}!", format_clock(secs))
                } else {
                    format!("You held for {}", format_clock(secs))
                };
                self.set_status(text, StatusKind::Info);
                self.notes.clear();
                self.refresh_evaluations();
            }
            Err(e) => {
                log::error!("failed to save evaluation: {e}");
                self.set_status("Could not save evaluation".into(), StatusKind::Error);
            }
        }
    }

    fn refresh_evaluations(&mut self) {
        let Some(log) = &self.evaluations else {
            return;
        };
        self.evaluation_stats = match log.load() {
            Ok(records) => EvaluationStats::from_records(&records),
            Err(e) => {
                log::warn!("failed to read evaluations: {e}");
                EvaluationStats::default()
            }
        };
    }

    fn set_status(&mut self, text: String, kind: StatusKind) {
        self.status = Some(Status {
            text,
            kind,
            shown_at: Instant::now(),
        });
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending hotkey events (non-blocking).
    fn poll_hotkey(&mut self) {
        while let Ok(event) = self.hotkey_rx.try_recv() {
            match event {
                HotkeyEvent::ToggleSession => self.toggle_session(),
                HotkeyEvent::ToggleMute => self.toggle_mute(),
            }
        }
    }

    fn expire_status(&mut self) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    // ── Renderers ────────────────────────────────────────────────────────

    /// The breathing circle with its label.
    fn draw_circle(&mut self, ui: &mut egui::Ui, view: &CircleView, now: Instant) {
        let side = ui.available_width().min(320.0);
        let (rect, _) = ui.allocate_exact_size(egui::vec2(side, side), egui::Sense::hover());
        let painter = ui.painter();
        let radius = side / 2.0;

        painter.circle_filled(rect.center(), radius, view.palette.background);

        let scale = self.animator.scale_at(now);
        painter.circle_filled(
            rect.center(),
            (radius - CIRCLE_INSET).max(0.0) * scale,
            view.palette.circle,
        );

        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            view.label,
            egui::FontId::proportional(22.0),
            egui::Color32::WHITE,
        );
    }

    fn draw_clock(&self, ui: &mut egui::Ui, elapsed: u64) {
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format_clock(elapsed))
                    .monospace()
                    .size(28.0),
            );
        });
    }

    /// Mode and exercise selectors; locked while a session runs.
    fn draw_selectors(&mut self, ui: &mut egui::Ui, active: bool) {
        ui.add_enabled_ui(!active, |ui| {
            ui.horizontal(|ui| {
                ui.label("Pace:");
                let mut mode = self.timer.mode();
                for candidate in CadenceMode::ALL {
                    ui.selectable_value(&mut mode, candidate, candidate.label());
                }
                if mode != self.timer.mode() {
                    match self.timer.set_mode(mode) {
                        Ok(()) => self.config.timer.mode = mode,
                        Err(e) => log::warn!("mode change rejected: {e}"),
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Exercise:");
                let mut exercise = self.timer.exercise_type();
                for candidate in ExerciseType::ALL {
                    ui.selectable_value(&mut exercise, candidate, candidate.label());
                }
                if exercise != self.timer.exercise_type() {
                    self.timer.set_exercise_type(exercise);
                    self.config.timer.exercise_type = exercise;
                }
            });
        });
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, active: bool) {
        ui.horizontal(|ui| {
            let start_stop = if active { "Stop" } else { "Start" };
            if ui
                .add(egui::Button::new(egui::RichText::new(start_stop).size(16.0)))
                .clicked()
            {
                self.toggle_session();
            }

            let mute = if self.timer.is_muted() { "Unmute" } else { "Mute" };
            if ui.button(mute).clicked() {
                self.toggle_mute();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "{} start/stop · {} mute",
                        self.config.hotkey.toggle_session_key, self.config.hotkey.toggle_mute_key
                    ))
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(11.0),
                );
            });
        });
    }

    fn draw_footer(&self, ui: &mut egui::Ui) {
        if let Some(status) = &self.status {
            let color = match status.kind {
                StatusKind::Info => egui::Color32::from_rgb(80, 160, 100),
                StatusKind::Error => egui::Color32::from_rgb(220, 110, 60),
            };
            ui.label(egui::RichText::new(&status.text).color(color).size(12.0));
        }

        if self.history.is_some() {
            let grey = egui::Color32::from_rgb(120, 120, 120);
            let text = match &self.today {
                Some(day) => format!(
                    "Today: {} across {} session{}",
                    format_clock(day.total_secs),
                    day.sessions,
                    if day.sessions == 1 { "" } else { "s" }
                ),
                None => "Today: no sessions yet".to_owned(),
            };
            ui.label(egui::RichText::new(text).color(grey).size(12.0));

            if let Some(day) = &self.today {
                ui.label(egui::RichText::new(day.breakdown()).color(grey).size(11.0));
            }
        }
    }

    /// Hold clock, Start/Release and the notes box.
    fn draw_evaluation(&mut self, ui: &mut egui::Ui, now: Instant) {
        let holding = self.hold.is_holding();
        let secs = self.hold.elapsed_secs(now);

        ui.label(
            egui::RichText::new(
                "Inhale deeply, then squeeze your pelvic floor as strongly as possible. \
                 Press Release when you can no longer hold the contraction.",
            )
            .size(13.0),
        );
        ui.add_space(12.0);

        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format_clock(secs))
                    .monospace()
                    .size(40.0),
            );
            let progress = if holding { (secs % 60) as f32 / 60.0 } else { 0.0 };
            ui.add(egui::ProgressBar::new(progress).desired_width(ui.available_width() * 0.8));
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!holding, egui::Button::new(egui::RichText::new("Start").size(16.0)))
                    .clicked()
                {
                    self.start_hold();
                }
                if ui
                    .add_enabled(holding, egui::Button::new(egui::RichText::new("Release").size(16.0)))
                    .clicked()
                {
                    self.release_hold();
                }
            });

            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(encouragement(secs, self.evaluation_stats.best_secs))
                    .color(egui::Color32::from_rgb(155, 135, 245)),
            );
        });

        ui.add_space(8.0);
        ui.label("Notes (optional)");
        ui.add_enabled(
            !holding,
            egui::TextEdit::multiline(&mut self.notes)
                .hint_text("How did it feel? Harder or easier than usual?")
                .desired_rows(2)
                .desired_width(f32::INFINITY),
        );
    }

    /// Personal best, average, count and the latest results.
    fn draw_evaluation_stats(&self, ui: &mut egui::Ui) {
        if self.evaluations.is_none() {
            ui.label("History is disabled; evaluations are not saved.");
            return;
        }

        let stats = &self.evaluation_stats;
        let or_none = |secs: u64| {
            if secs > 0 {
                format_clock(secs)
            } else {
                "No data yet".to_owned()
            }
        };

        egui::Grid::new("evaluation_stats")
            .num_columns(2)
            .spacing([24.0, 4.0])
            .show(ui, |ui| {
                ui.label("Personal best");
                ui.strong(or_none(stats.best_secs));
                ui.end_row();

                ui.label("Average hold");
                ui.strong(or_none(stats.average_secs));
                ui.end_row();

                ui.label("Tests completed");
                ui.strong(stats.count.to_string());
                ui.end_row();
            });

        ui.add_space(6.0);
        if stats.recent.is_empty() {
            ui.label("Complete your first evaluation to see your results here.");
            return;
        }
        ui.label(egui::RichText::new("Recent").size(12.0));
        for record in &stats.recent {
            ui.horizontal(|ui| {
                ui.label(
                    record
                        .recorded_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d")
                        .to_string(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.monospace(format_clock(record.hold_duration_secs));
                });
            });
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for KegelCoachApp {
    /// Called every frame by eframe.  Polls hotkeys, retargets the circle,
    /// then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_hotkey();
        self.expire_status();

        let now = Instant::now();
        let snapshot = self.timer.snapshot();
        let view = CircleView::new(&snapshot, self.timer.exercise_type());
        self.animator.retarget(&view, now);

        if self.animator.is_animating(now) {
            ctx.request_repaint();
        } else {
            // Keep polling the hotkey channel and the status timeout.
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::WHITE).inner_margin(egui::Margin::same(12)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.view, View::Breathe, "Breathe");
                    ui.selectable_value(&mut self.view, View::Evaluate, "Evaluate");
                });
                ui.separator();

                match self.view {
                    View::Breathe => {
                        ui.vertical_centered(|ui| {
                            self.draw_circle(ui, &view, now);
                        });
                        ui.add_space(8.0);
                        self.draw_clock(ui, snapshot.elapsed_total);
                        ui.separator();
                        self.draw_selectors(ui, snapshot.active);
                        ui.add_space(6.0);
                        self.draw_controls(ui, snapshot.active);
                    }
                    View::Evaluate => {
                        self.draw_evaluation(ui, now);
                        ui.separator();
                        self.draw_evaluation_stats(ui);
                    }
                }
                ui.add_space(6.0);
                self.draw_footer(ui);
            });
    }

    /// Record a running session or hold and persist the selected
    /// pace/exercise.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.timer.is_active() {
            self.stop_session();
        }
        self.release_hold();
        if let Err(e) = self.config.save() {
            log::warn!("failed to save settings: {e}");
        }
        log::info!("Kegel Coach closing");
    }
}

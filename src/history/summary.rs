//! Per-day aggregation of [`SessionRecord`]s.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, TimeZone};

use super::SessionRecord;
use crate::cadence::{CadenceMode, ExerciseType};

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_secs: u64,
    pub by_mode: BTreeMap<CadenceMode, u64>,
    pub by_exercise: BTreeMap<ExerciseType, u64>,
    pub sessions: usize,
}

impl DailySummary {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_secs: 0,
            by_mode: BTreeMap::new(),
            by_exercise: BTreeMap::new(),
            sessions: 0,
        }
    }

    fn add(&mut self, record: &SessionRecord) {
        self.total_secs += record.duration_secs;
        *self.by_mode.entry(record.mode).or_default() += record.duration_secs;
        *self.by_exercise.entry(record.exercise_type).or_default() += record.duration_secs;
        self.sessions += 1;
    }

    pub fn mode_secs(&self, mode: CadenceMode) -> u64 {
        self.by_mode.get(&mode).copied().unwrap_or(0)
    }

    pub fn exercise_secs(&self, exercise: ExerciseType) -> u64 {
        self.by_exercise.get(&exercise).copied().unwrap_or(0)
    }

    /// Time per exercise, then per pace, skipping zeros:
    /// `"Kegel 3:00 · Relaxation 0:20 | Normal 2:00 · Fast 1:20"`.
    pub fn breakdown(&self) -> String {
        let exercises: Vec<String> = ExerciseType::ALL
            .into_iter()
            .filter_map(|ex| {
                let secs = self.exercise_secs(ex);
                (secs > 0).then(|| format!("{} {}", ex.label(), format_clock(secs)))
            })
            .collect();
        let modes: Vec<String> = CadenceMode::ALL
            .into_iter()
            .filter_map(|mode| {
                let secs = self.mode_secs(mode);
                (secs > 0).then(|| format!("{} {}", mode.label(), format_clock(secs)))
            })
            .collect();

        [exercises.join(" · "), modes.join(" · ")]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Group `records` by local calendar date, newest day first.
pub fn daily_summaries(records: &[SessionRecord]) -> Vec<DailySummary> {
    daily_summaries_in(records, &Local)
}

/// [`daily_summaries`] in an explicit time zone.
pub fn daily_summaries_in<Tz: TimeZone>(records: &[SessionRecord], tz: &Tz) -> Vec<DailySummary> {
    let mut days: BTreeMap<NaiveDate, DailySummary> = BTreeMap::new();
    for record in records {
        let date = record.started_at.with_timezone(tz).date_naive();
        days.entry(date)
            .or_insert_with(|| DailySummary::new(date))
            .add(record);
    }
    days.into_values().rev().collect()
}

/// `m:ss`, the session clock format.
///
/// ```
/// use kegel_coach::history::format_clock;
///
/// assert_eq!(format_clock(0), "0:00");
/// assert_eq!(format_clock(75), "1:15");
/// assert_eq!(format_clock(3_600), "60:00");
/// ```
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

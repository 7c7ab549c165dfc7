//! Pelvic-floor strength evaluations: how long a single contraction was
//! held, with optional notes, and the statistics shown beside the test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Holds shorter than this are not recorded.
pub const MIN_HOLD_SECS: u64 = 1;

/// How many results the "recent" list shows.
pub const RECENT_EVALUATIONS: usize = 5;

/// One completed hold test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub recorded_at: DateTime<Utc>,
    pub hold_duration_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EvaluationRecord {
    /// Build a record for a hold that was just released, or `None` when it
    /// was too short to count.  Blank notes are stored as `None`.
    pub fn finished(recorded_at: DateTime<Utc>, hold_duration_secs: u64, notes: &str) -> Option<Self> {
        if hold_duration_secs < MIN_HOLD_SECS {
            return None;
        }
        let notes = notes.trim();
        Some(Self {
            recorded_at,
            hold_duration_secs,
            notes: (!notes.is_empty()).then(|| notes.to_owned()),
        })
    }
}

// ---------------------------------------------------------------------------
// EvaluationStats
// ---------------------------------------------------------------------------

/// Personal best, rounded average and the latest results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub best_secs: u64,
    pub average_secs: u64,
    pub count: usize,
    /// Newest first, at most [`RECENT_EVALUATIONS`].
    pub recent: Vec<EvaluationRecord>,
}

impl EvaluationStats {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let count = records.len();
        let total: u64 = records.iter().map(|r| r.hold_duration_secs).sum();
        let best_secs = records
            .iter()
            .map(|r| r.hold_duration_secs)
            .max()
            .unwrap_or(0);

        let mut recent = records.to_vec();
        recent.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        recent.truncate(RECENT_EVALUATIONS);

        Self {
            best_secs,
            // Half-up rounding.
            average_secs: (total + count as u64 / 2) / count as u64,
            count,
            recent,
        }
    }

    /// `true` when `hold_secs` beats every earlier result.
    pub fn is_new_best(&self, hold_secs: u64) -> bool {
        hold_secs > self.best_secs
    }
}

/// Feedback line for a hold of `hold_secs` against the personal best.
pub fn encouragement(hold_secs: u64, best_secs: u64) -> &'static str {
    if hold_secs == 0 {
        return "Ready to test your pelvic floor strength!";
    }
    if best_secs == 0 {
        return "Great first attempt! Keep practicing.";
    }
    if hold_secs >= best_secs {
        return "Amazing! You're at your best today!";
    }

    match hold_secs * 100 / best_secs {
        90.. => "Excellent! Nearly your personal best!",
        75.. => "Great effort! Keep pushing!",
        50.. => "Good work! You're on the right track.",
        _ => "Keep practicing! Every session makes you stronger.",
    }
}

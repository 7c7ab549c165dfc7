//! Session history: one JSON line per finished session, plus per-day
//! summaries for the UI.  Strength evaluations are kept the same way in a
//! second log.
//!
//! ```text
//! BreathingTimer::stop ──▶ SessionRecord::finished ──▶ SessionLog::append
//!                                                         │ sessions.jsonl
//! UI "today" line ◀── daily_summaries ◀── SessionLog::load ┘
//!
//! HoldTimer::release ──▶ EvaluationRecord::finished ──▶ EvaluationLog::append
//!                                                         │ evaluations.jsonl
//! UI statistics ◀── EvaluationStats ◀── EvaluationLog::load ┘
//! ```

pub mod evaluation;
pub mod store;
pub mod summary;

pub use evaluation::{encouragement, EvaluationRecord, EvaluationStats};
pub use store::{EvaluationLog, JsonlLog, SessionLog};
pub use summary::{daily_summaries, daily_summaries_in, format_clock, DailySummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cadence::{CadenceMode, ExerciseType};

/// Sessions shorter than this are not recorded.
pub const MIN_SESSION_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// One completed breathing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub mode: CadenceMode,
    /// Older logs may lack this field; they were all Kegel sessions.
    #[serde(default)]
    pub exercise_type: ExerciseType,
}

impl SessionRecord {
    /// Build a record for a session that just ended, or `None` when it was
    /// too short to count.
    pub fn finished(
        started_at: DateTime<Utc>,
        duration_secs: u64,
        mode: CadenceMode,
        exercise_type: ExerciseType,
    ) -> Option<Self> {
        (duration_secs >= MIN_SESSION_SECS).then_some(Self {
            started_at,
            duration_secs,
            mode,
            exercise_type,
        })
    }
}

// ---------------------------------------------------------------------------
// HistoryError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history log I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode history record: {0}")]
    Encode(#[from] serde_json::Error),
}

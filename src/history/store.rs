//! Append-only JSON-lines logs.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{EvaluationRecord, HistoryError, SessionRecord};

/// `sessions.jsonl` on disk.  Each line is one [`SessionRecord`].
pub type SessionLog = JsonlLog<SessionRecord>;

/// `evaluations.jsonl` on disk.  Each line is one [`EvaluationRecord`].
pub type EvaluationLog = JsonlLog<EvaluationRecord>;

/// A file holding one JSON-encoded `T` per line.
#[derive(Debug, Clone)]
pub struct JsonlLog<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlLog<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, creating the file and its parent directories.
    pub fn append(&self, record: &T) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;

        log::debug!("history: appended to {}", self.path.display());
        Ok(())
    }

    /// Read every record in file order.
    ///
    /// A missing file is an empty history.  Malformed lines are skipped
    /// with a warning so one bad write never hides the rest.
    pub fn load(&self) -> Result<Vec<T>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!(
                    "history: skipping line {} of {}: {e}",
                    n + 1,
                    self.path.display()
                ),
            }
        }
        Ok(records)
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{CadenceMode, ExerciseType};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn record(minute: u32, secs: u64, mode: CadenceMode) -> SessionRecord {
        SessionRecord {
            started_at: Utc.with_ymd_and_hms(2026, 5, 2, 9, minute, 0).unwrap(),
            duration_secs: secs,
            mode,
            exercise_type: ExerciseType::Kegel,
        }
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempdir().expect("temp dir");
        let log = SessionLog::new(dir.path().join("sessions.jsonl"));
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn appended_records_load_in_order() {
        let dir = tempdir().expect("temp dir");
        let log = SessionLog::new(dir.path().join("nested/sessions.jsonl"));
        let first = record(0, 60, CadenceMode::Normal);
        let second = record(5, 12, CadenceMode::Fast);

        log.append(&first).unwrap();
        log.append(&second).unwrap();

        assert_eq!(log.load().unwrap(), vec![first, second]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("sessions.jsonl");
        let log = SessionLog::new(&path);
        log.append(&record(0, 30, CadenceMode::VeryFast)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();
        drop(file);
        log.append(&record(1, 45, CadenceMode::Normal)).unwrap();

        let loaded = log.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].duration_secs, 45);
    }

    #[test]
    fn evaluation_log_keeps_notes() {
        let dir = tempdir().expect("temp dir");
        let log = EvaluationLog::new(dir.path().join("evaluations.jsonl"));
        let at = Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap();
        let with_notes = EvaluationRecord::finished(at, 14, "  felt strong ").unwrap();
        let bare = EvaluationRecord::finished(at, 9, "").unwrap();

        log.append(&with_notes).unwrap();
        log.append(&bare).unwrap();

        let loaded = log.load().unwrap();
        assert_eq!(loaded[0].notes.as_deref(), Some("felt strong"));
        assert_eq!(loaded[1].notes, None);
    }
}

//! JSONL run log
//!
//! [`RunLog`] is an explicit handle owned by whoever drives the pipeline.
//! Each record is one JSON object per line:
//!
//! ```json
//! {"seq":3,"ts":"2026-10-18T09:12:44.120Z","event":"scene_committed","scene":2,"issues":0}
//! ```
//!
//! Every record is flushed as soon as it is written, so a record call that
//! returns `Ok` has reached the file.

use crate::error::RunLogError;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct Sink {
    writer: BufWriter<File>,
    seq: u64,
}

/// Append-only JSONL event sink
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    sink: Mutex<Sink>,
}

impl RunLog {
    /// Open (or create) a log file for appending
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be created
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RunLogError> {
        let path = path.into();
        let io_err = |source| RunLogError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        tracing::debug!(path = %path.display(), "run log opened");
        Ok(Self {
            path,
            sink: Mutex::new(Sink {
                writer: BufWriter::new(file),
                seq: 0,
            }),
        })
    }

    /// Log file location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    ///
    /// `fields` is merged into the record when it is an object and stored
    /// under `data` otherwise. `seq`, `ts` and `event` are reserved.
    ///
    /// # Errors
    /// Returns error if the record cannot be serialized or written
    pub fn record(&self, event: &str, fields: Value) -> Result<(), RunLogError> {
        let mut sink = self.sink.lock();
        sink.seq += 1;

        let mut record = Map::new();
        record.insert("seq".to_string(), Value::from(sink.seq));
        record.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("event".to_string(), Value::from(event));
        match fields {
            Value::Object(map) => {
                for (key, value) in map {
                    record.entry(key).or_insert(value);
                }
            }
            Value::Null => {}
            other => {
                record.insert("data".to_string(), other);
            }
        }

        let line = serde_json::to_string(&Value::Object(record))?;
        writeln!(sink.writer, "{line}")
            .and_then(|()| sink.writer.flush())
            .map_err(|source| RunLogError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Flush buffered records to disk
    ///
    /// # Errors
    /// Returns error if the underlying write fails
    pub fn flush(&self) -> Result<(), RunLogError> {
        self.sink
            .lock()
            .writer
            .flush()
            .map_err(|source| RunLogError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Err(e) = self.sink.get_mut().writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "run log flush failed on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn records_are_flushed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.jsonl");
        {
            let log = RunLog::create(&path).unwrap();
            log.record("scene_started", json!({"scene": 1})).unwrap();
            log.record("note", json!("plain text")).unwrap();
        }

        let records = lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["event"], "scene_started");
        assert_eq!(records[0]["scene"], 1);
        assert_eq!(records[0]["seq"], 1);
        assert_eq!(records[1]["data"], "plain text");
        assert_eq!(records[1]["seq"], 2);
        assert!(records[0]["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn reserved_keys_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let log = RunLog::create(&path).unwrap();
        log.record("real", json!({"event": "fake", "seq": 99})).unwrap();
        log.flush().unwrap();

        let records = lines(&path);
        assert_eq!(records[0]["event"], "real");
        assert_eq!(records[0]["seq"], 1);
    }

    #[test]
    fn records_are_visible_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let log = RunLog::create(&path).unwrap();
        log.record("scene_committed", json!({"scene": 1})).unwrap();
        assert_eq!(lines(&path).len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_failures_are_reported() {
        let log = RunLog::create("/dev/full").unwrap();
        assert!(matches!(
            log.record("scene_committed", Value::Null),
            Err(RunLogError::Io { .. })
        ));
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        RunLog::create(&path).unwrap().record("a", Value::Null).unwrap();
        RunLog::create(&path).unwrap().record("b", Value::Null).unwrap();
        assert_eq!(lines(&path).len(), 2);
    }
}

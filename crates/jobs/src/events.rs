//! Append-only audit log of job events.
//!
//! One JSON object per line: `{"event": ..., "id": ..., <fields>, "ts": ...}`.
//! The log is for operators; nothing in the service reads it back.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// NDJSON event writer. Each record is a single `write_all` of one line.
pub struct EventLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl EventLog {
    /// Open `path` for appending, creating the file and its directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open event log: {:?}", path))?;

        tracing::info!("Writing job events to {:?}", path);
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Append one event. `fields` must be a JSON object (or null for none).
    pub fn record(&self, event: &str, id: &str, fields: Value) -> Result<()> {
        let mut entry = Map::new();
        entry.insert("event".into(), Value::from(event));
        entry.insert("id".into(), Value::from(id));
        if let Value::Object(extra) = fields {
            entry.extend(extra);
        }
        entry.insert(
            "ts".into(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
        );

        let mut line = serde_json::to_string(&entry).context("Failed to encode event")?;
        line.push('\n');
        self.file
            .lock()
            .write_all(line.as_bytes())
            .context("Failed to write event")?;
        Ok(())
    }

    /// [`record`](Self::record), logging instead of returning failures.
    pub fn emit(&self, event: &str, id: &str, fields: Value) {
        if let Err(error) = self.record(event, id, fields) {
            tracing::warn!(job_id = %id, "Event log write failed: {:#}", error);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

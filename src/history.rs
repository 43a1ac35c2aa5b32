// src/history.rs

//! Append-only lifecycle log shared by all job executions.
//!
//! One line per event:
//!
//! ```text
//! nightly started 2026-10-17 02:00:00
//! home started 2026-10-17 02:00:01 (dry run)
//! ```
//!
//! The file is opened and closed for every event, and each line goes out in a
//! single append, so concurrent job workers never interleave inside a line.
//! Write failures are logged and swallowed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::errors::Result;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DRY_RUN_SUFFIX: &str = " (dry run)";

/// Lifecycle status written to the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Started,
    Done,
    Failed,
    Canceled,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Started => "started",
            HistoryStatus::Done => "done",
            HistoryStatus::Failed => "failed",
            HistoryStatus::Canceled => "canceled",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(HistoryStatus::Started),
            "done" => Some(HistoryStatus::Done),
            "failed" => Some(HistoryStatus::Failed),
            "canceled" => Some(HistoryStatus::Canceled),
            _ => None,
        }
    }
}

/// One parsed history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub entity_id: String,
    pub status: HistoryStatus,
    pub timestamp: String,
    pub dry_run: bool,
}

impl HistoryEntry {
    /// Parse `{id} {status} {timestamp}[ (dry run)]`. Returns `None` for
    /// lines that do not have that shape.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ' ');
        let entity_id = parts.next().filter(|s| !s.is_empty())?;
        let status = HistoryStatus::parse(parts.next()?)?;
        let rest = parts.next()?;

        let (timestamp, dry_run) = match rest.strip_suffix(DRY_RUN_SUFFIX) {
            Some(ts) => (ts, true),
            None => (rest, false),
        };

        Some(Self {
            entity_id: entity_id.to_string(),
            status,
            timestamp: timestamp.to_string(),
            dry_run,
        })
    }
}

/// Format a single history line, including the trailing newline.
pub fn history_line(
    entity_id: &str,
    status: HistoryStatus,
    timestamp: DateTime<Local>,
    dry_run: bool,
) -> String {
    format!(
        "{} {} {}{}\n",
        entity_id,
        status.as_str(),
        timestamp.format(TIMESTAMP_FORMAT),
        if dry_run { DRY_RUN_SUFFIX } else { "" }
    )
}

#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    path: PathBuf,
}

impl HistoryRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. Never fails; I/O errors are logged.
    pub fn record(
        &self,
        entity_id: &str,
        status: HistoryStatus,
        timestamp: DateTime<Local>,
        dry_run: bool,
    ) {
        let line = history_line(entity_id, status, timestamp, dry_run);

        match self.append(&line) {
            Ok(()) => debug!(entity = %entity_id, status = status.as_str(), "history event recorded"),
            Err(e) => warn!(
                entity = %entity_id,
                status = status.as_str(),
                path = ?self.path,
                error = %e,
                "failed to append history event"
            ),
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// All entries recorded for `entity_id`, oldest first. A missing file
    /// yields an empty list; malformed lines are skipped.
    pub fn entries_for(&self, entity_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.entity_id == entity_id)
            .collect())
    }

    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.lines().filter_map(HistoryEntry::parse).collect())
    }
}

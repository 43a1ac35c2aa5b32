// src/status/file.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{RunStatus, RunStatusStore};

/// Keeps a `job id → RunStatus` table in a single TOML file:
///
/// ```toml
/// [nightly]
/// last_run = "2026-10-17T02:00:00+02:00"
/// exit_code = 0
/// ```
///
/// Writes are read-modify-write under a process-local lock, so concurrent
/// job workers sharing one store do not lose each other's updates.
#[derive(Debug)]
pub struct TomlStatusStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TomlStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, RunStatus>> {
        if !self.path.is_file() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading status file {:?}", self.path))?;
        let table = toml::from_str(&contents)
            .with_context(|| format!("parsing status file {:?}", self.path))?;
        Ok(table)
    }
}

impl RunStatusStore for TomlStatusStore {
    fn save(&self, job_id: &str, status: RunStatus) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut table = match self.read_table() {
            Ok(table) => table,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "unreadable status file; starting a fresh one");
                BTreeMap::new()
            }
        };
        table.insert(job_id.to_string(), status);

        let contents = toml::to_string(&table).context("serializing run status table")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("writing status file {:?}", self.path))?;

        debug!(job = %job_id, exit_code = status.exit_code, "run status saved");
        Ok(())
    }

    fn load(&self, job_id: &str) -> Option<RunStatus> {
        match self.read_table() {
            Ok(mut table) => table.remove(job_id),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read status file");
                None
            }
        }
    }
}

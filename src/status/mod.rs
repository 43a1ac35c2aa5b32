// src/status/mod.rs

//! Last-run metadata of jobs (`last_run`, `last_run_exit_code`).
//!
//! The engine writes one [`RunStatus`] per finished job execution through the
//! [`RunStatusStore`] trait. [`TomlStatusStore`] persists to disk;
//! [`MemoryStatusStore`] is for tests and embedders that keep their own store.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub mod file;

pub use file::TomlStatusStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// When the execution started.
    pub last_run: DateTime<Local>,
    pub exit_code: i32,
}

/// Abstract run-status persistence.
pub trait RunStatusStore: Send + Sync + Debug {
    fn save(&self, job_id: &str, status: RunStatus) -> Result<()>;
    fn load(&self, job_id: &str) -> Option<RunStatus>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    entries: Arc<Mutex<HashMap<String, RunStatus>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStatusStore for MemoryStatusStore {
    fn save(&self, job_id: &str, status: RunStatus) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(job_id.to_string(), status);
        Ok(())
    }

    fn load(&self, job_id: &str) -> Option<RunStatus> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(job_id).copied()
    }
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{EngineError, Result};
use crate::job::{ExecuteSection, Job, Task, TaskExecuteSection};
use crate::status::RunStatusStore;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [settings]
/// rsync_path = "/usr/bin/rsync"
///
/// [job.nightly]
/// name = "Nightly"
/// tasks = ["home", "photos"]
///
/// [job.nightly.execute.after]
/// enabled = true
/// command = "/usr/local/bin/notify-done"
///
/// [task.home]
/// source = "/home/me/"
/// destination = "/mnt/backup/home"
/// options = ["--archive", "--delete"]
/// excludes = ["*.tmp"]
///
/// [task.home.execute]
/// halt_job_on_error = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// Keys are job ids.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,

    /// Keys are task ids, referenced from `job.<id>.tasks`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// The rsync binary. Looked up on `PATH` when not absolute.
    #[serde(default = "default_rsync_path")]
    pub rsync_path: String,

    /// Append-only history log. Relative paths are resolved against the
    /// directory containing the config file.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Last-run status of each job.
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,

    /// Run every job as a dry run unless overridden on the command line.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_rsync_path() -> String {
    "rsync".to_string()
}

fn default_history_file() -> PathBuf {
    PathBuf::from(".rsyncjob/history")
}

fn default_status_file() -> PathBuf {
    PathBuf::from(".rsyncjob/status.toml")
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            rsync_path: default_rsync_path(),
            history_file: default_history_file(),
            status_file: default_status_file(),
            dry_run: false,
        }
    }
}

/// `[job.<id>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobConfig {
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    /// Task ids in execution order.
    #[serde(default)]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub execute: ExecuteSection,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub name: Option<String>,

    pub source: String,

    pub destination: String,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub excludes: Vec<String>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub execute: TaskExecuteSection,
}

/// Validated configuration.
///
/// Every task reference of every job is known to resolve, so [`ConfigFile::job`]
/// only fails for an unknown job id.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: SettingsSection,
    job: BTreeMap<String, JobConfig>,
    task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Construct without validation. Used by `TryFrom<RawConfigFile>` after it
    /// has checked the raw config.
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        job: BTreeMap<String, JobConfig>,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            settings,
            job,
            task,
        }
    }

    /// Job ids in sorted order.
    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.job.keys().map(|s| s.as_str())
    }

    /// Resolve a job and its tasks.
    pub fn job(&self, id: &str) -> Result<Job> {
        let cfg = self
            .job
            .get(id)
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))?;

        let tasks = cfg
            .tasks
            .iter()
            .map(|task_id| self.task(task_id))
            .collect::<Result<Vec<_>>>()?;

        Ok(Job {
            id: id.to_string(),
            name: cfg.name.clone().unwrap_or_else(|| id.to_string()),
            tasks,
            execute: cfg.execute.clone(),
            last_run: None,
            last_run_exit_code: None,
        })
    }

    /// Resolve a job and fill in its last-run metadata from `store`.
    pub fn job_with_status(&self, id: &str, store: &dyn RunStatusStore) -> Result<Job> {
        let mut job = self.job(id)?;
        if let Some(status) = store.load(id) {
            job.last_run = Some(status.last_run);
            job.last_run_exit_code = Some(status.exit_code);
        }
        Ok(job)
    }

    fn task(&self, id: &str) -> Result<Task> {
        let cfg = self.task.get(id).ok_or_else(|| {
            EngineError::ConfigError(format!("unknown task '{}'", id))
        })?;

        Ok(Task {
            id: id.to_string(),
            name: cfg.name.clone().unwrap_or_else(|| id.to_string()),
            source: cfg.source.clone(),
            destination: cfg.destination.clone(),
            options: cfg.options.clone(),
            excludes: cfg.excludes.clone(),
            dry_run: cfg.dry_run,
            execute: cfg.execute.clone(),
        })
    }

    /// Resolve relative history/status paths against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        if self.settings.history_file.is_relative() {
            self.settings.history_file = root.join(&self.settings.history_file);
        }
        if self.settings.status_file.is_relative() {
            self.settings.status_file = root.join(&self.settings.status_file);
        }
    }
}

// src/job/model.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::job::command::DRY_RUN_FLAG;

/// One optional hook script.
///
/// ```toml
/// [job.nightly.execute.before]
/// enabled = true
/// command = "/usr/local/bin/mount-backup-disk"
/// halt_on_error = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecuteItem {
    #[serde(default)]
    pub enabled: bool,

    /// Path to an executable. Invoked without arguments.
    #[serde(default)]
    pub command: String,

    /// If the script fails, stop the surrounding job or task sequence.
    #[serde(default)]
    pub halt_on_error: bool,
}

impl ExecuteItem {
    pub fn new(command: impl Into<String>, halt_on_error: bool) -> Self {
        Self {
            enabled: true,
            command: command.into(),
            halt_on_error,
        }
    }

    /// Whether this item would actually run anything.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.command.trim().is_empty()
    }
}

/// The four hook slots around a job or a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSlot {
    Before,
    AfterFail,
    AfterOk,
    After,
}

impl HookSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookSlot::Before => "before",
            HookSlot::AfterFail => "after failure",
            HookSlot::AfterOk => "after success",
            HookSlot::After => "after",
        }
    }
}

/// Hook scripts of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecuteSection {
    #[serde(default)]
    pub before: ExecuteItem,
    #[serde(default)]
    pub after_fail: ExecuteItem,
    #[serde(default)]
    pub after_ok: ExecuteItem,
    #[serde(default)]
    pub after: ExecuteItem,
}

impl ExecuteSection {
    pub fn item(&self, slot: HookSlot) -> &ExecuteItem {
        match slot {
            HookSlot::Before => &self.before,
            HookSlot::AfterFail => &self.after_fail,
            HookSlot::AfterOk => &self.after_ok,
            HookSlot::After => &self.after,
        }
    }
}

/// Hook scripts of a task, plus the flag deciding whether a failed task stops
/// the remaining tasks of its job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskExecuteSection {
    #[serde(default)]
    pub before: ExecuteItem,
    #[serde(default)]
    pub after_fail: ExecuteItem,
    #[serde(default)]
    pub after_ok: ExecuteItem,
    #[serde(default)]
    pub after: ExecuteItem,
    #[serde(default)]
    pub halt_job_on_error: bool,
}

impl TaskExecuteSection {
    pub fn item(&self, slot: HookSlot) -> &ExecuteItem {
        match slot {
            HookSlot::Before => &self.before,
            HookSlot::AfterFail => &self.after_fail,
            HookSlot::AfterOk => &self.after_ok,
            HookSlot::After => &self.after,
        }
    }
}

/// A single source → destination sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub source: String,
    pub destination: String,
    /// rsync flags, e.g. `--archive`, `--delete`.
    pub options: Vec<String>,
    /// Patterns passed as `--exclude=<pattern>`.
    pub excludes: Vec<String>,
    pub dry_run: bool,
    pub execute: TaskExecuteSection,
}

impl Task {
    /// A task is dry-run when flagged so, or when its own options already ask
    /// rsync for a trial run.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.options.iter().any(|o| o == DRY_RUN_FLAG)
    }
}

/// A named, ordered collection of tasks with its own hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
    pub execute: ExecuteSection,
    pub last_run: Option<DateTime<Local>>,
    pub last_run_exit_code: Option<i32>,
}

// src/engine/mod.rs

//! Job execution engine.
//!
//! One execution of a job flows through:
//! - [`supervisor`]: registry of active runs, one tokio worker per run,
//!   cancellation routing;
//! - [`orchestrator`]: job-level hooks, task iteration, terminal bookkeeping;
//! - [`task_runner`]: one task's hooks and its rsync process;
//! - [`hooks`]: a single optional hook script.
//!
//! The state of one execution lives in a [`RunContext`] owned by its worker.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::exec::ProcessLauncher;
use crate::history::{HistoryRecorder, HistoryStatus};
use crate::output::LineMode;
use crate::status::RunStatusStore;

pub mod context;
pub mod hooks;
pub mod orchestrator;
pub mod supervisor;
pub mod task_runner;

pub use context::RunContext;
pub use hooks::{HookOutcome, HookPhase, HookScope, run_hook};
pub use orchestrator::run_job;
pub use supervisor::{ExecutionSupervisor, RunHandle};
pub use task_runner::{TaskReport, run_task};

/// Canonical job id type used throughout the engine.
pub type JobId = String;

/// How a job execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Done,
    Failed,
    Canceled,
}

impl TerminalState {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminalState::Done => 0,
            TerminalState::Failed => 1,
            TerminalState::Canceled => 99,
        }
    }

    pub fn label(&self) -> &'static str {
        self.history_status().as_str()
    }

    pub fn history_status(&self) -> HistoryStatus {
        match self {
            TerminalState::Done => HistoryStatus::Done,
            TerminalState::Failed => HistoryStatus::Failed,
            TerminalState::Canceled => HistoryStatus::Canceled,
        }
    }

    pub fn line_mode(&self) -> LineMode {
        match self {
            TerminalState::Done => LineMode::Ok,
            TerminalState::Failed => LineMode::Error,
            TerminalState::Canceled => LineMode::Warning,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run every task with `--dry-run`. Tasks can also opt in individually.
    pub dry_run: bool,
}

/// Summary of one finished job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub job_id: JobId,
    pub job_name: String,
    pub terminal: TerminalState,
    pub failed_tasks: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.terminal.exit_code()
    }
}

/// Collaborators shared by every execution of a supervisor.
#[derive(Clone)]
pub struct EngineServices {
    pub launcher: Arc<dyn ProcessLauncher>,
    pub history: HistoryRecorder,
    pub status: Arc<dyn RunStatusStore>,
    pub rsync_path: String,
}

impl EngineServices {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        history: HistoryRecorder,
        status: Arc<dyn RunStatusStore>,
        rsync_path: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            history,
            status,
            rsync_path: rsync_path.into(),
        }
    }
}

impl fmt::Debug for EngineServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineServices")
            .field("history", &self.history)
            .field("status", &self.status)
            .field("rsync_path", &self.rsync_path)
            .finish_non_exhaustive()
    }
}

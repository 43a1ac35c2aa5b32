// src/engine/context.rs

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::job::Job;
use crate::output::{LineMode, RunIo};

use super::{EngineServices, RunOptions};

/// State of one job execution, owned by its worker.
#[derive(Debug)]
pub struct RunContext {
    pub job: Job,
    /// Run-level dry-run flag; tasks may add their own.
    pub dry_run: bool,
    pub failed_tasks: usize,
    pub started_at: DateTime<Local>,
    pub io: RunIo,
    pub(crate) services: Arc<EngineServices>,
    cancel: CancellationToken,
    interrupted: bool,
    fold_level: usize,
}

impl RunContext {
    pub fn new(
        job: Job,
        options: RunOptions,
        io: RunIo,
        services: Arc<EngineServices>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            dry_run: options.dry_run,
            failed_tasks: 0,
            started_at: Local::now(),
            io,
            services,
            cancel,
            interrupted: false,
            fold_level: 0,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the run was cancelled. Once true, stays true.
    pub fn is_interrupted(&mut self) -> bool {
        if !self.interrupted && self.cancel.is_cancelled() {
            debug!(job = %self.job.id, "run interrupted");
            self.interrupted = true;
        }
        self.interrupted
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub(crate) fn out(&mut self, mode: LineMode, text: &str) {
        self.io.output.line(mode, text);
    }

    pub(crate) fn open_fold(&mut self) {
        self.fold_level += 1;
        self.io.output.fold_start(self.fold_level);
    }

    pub(crate) fn close_fold(&mut self) {
        if self.fold_level > 0 {
            self.io.output.fold_end(self.fold_level);
            self.fold_level -= 1;
        }
    }

    pub(crate) fn close_all_folds(&mut self) {
        while self.fold_level > 0 {
            self.close_fold();
        }
    }
}

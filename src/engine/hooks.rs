// src/engine/hooks.rs

//! Execution of a single optional hook script.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::exec::{OutputStream, ProcessExit, ProcessLine};
use crate::history::TIMESTAMP_FORMAT;
use crate::job::{ExecuteItem, HookSlot};
use crate::output::LineMode;

use super::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Job,
    Task,
}

/// Which hook is running, e.g. "task after failure".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPhase {
    pub scope: HookScope,
    pub slot: HookSlot,
}

impl HookPhase {
    pub fn job(slot: HookSlot) -> Self {
        Self {
            scope: HookScope::Job,
            slot,
        }
    }

    pub fn task(slot: HookSlot) -> Self {
        Self {
            scope: HookScope::Task,
            slot,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            HookScope::Job => "job",
            HookScope::Task => "task",
        };
        write!(f, "{} {}", scope, self.slot.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Disabled, blank command, or the run was already interrupted.
    Skipped,
    Succeeded,
    Failed {
        /// The hook asked for its sequence to stop.
        halt: bool,
        reason: String,
    },
}

impl HookOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, HookOutcome::Failed { .. })
    }

    pub fn halts(&self) -> bool {
        matches!(self, HookOutcome::Failed { halt: true, .. })
    }

    /// A halting failure as the error value carried up to the orchestrator.
    pub fn halted_error(&self, phase: HookPhase) -> Option<EngineError> {
        match self {
            HookOutcome::Failed { halt: true, reason } => Some(EngineError::Halted {
                step: phase.to_string(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// Run `item` if it is enabled and has a command.
///
/// The command must be an existing file; it is executed without arguments and
/// succeeds on exit code 0. Output is framed by a section header and, unless
/// the run was interrupted meanwhile, a completion line.
pub async fn run_hook(ctx: &mut RunContext, item: &ExecuteItem, phase: HookPhase) -> HookOutcome {
    if !item.is_active() {
        return HookOutcome::Skipped;
    }
    if ctx.is_interrupted() {
        debug!(job = %ctx.job.id, hook = %phase, "run interrupted; skipping hook");
        return HookOutcome::Skipped;
    }

    let label = phase.to_string();
    let command = item.command.trim().to_string();

    ctx.io
        .output
        .section_header(LineMode::Info, "start", &format!("'{label}':"), &command);

    if !Path::new(&command).is_file() {
        let reason = format!("file not found: {command}");
        ctx.out(LineMode::Error, &reason);
        if item.halt_on_error {
            warn!(job = %ctx.job.id, hook = %phase, command = %command, "hook script not found; halting");
        } else {
            warn!(job = %ctx.job.id, hook = %phase, command = %command, "hook script not found; continuing");
        }
        return HookOutcome::Failed {
            halt: item.halt_on_error,
            reason,
        };
    }

    info!(job = %ctx.job.id, hook = %phase, command = %command, "running hook");
    ctx.io.progress.indeterminate();

    let exit = launch_hook(ctx, &command).await;
    if exit == ProcessExit::Interrupted {
        ctx.mark_interrupted();
    }

    let success = exit.success();
    if !ctx.is_interrupted() {
        let (mode, status) = if success {
            (LineMode::Ok, "DONE")
        } else {
            (LineMode::Error, "ERROR")
        };
        let line = format!("{} {} '{}'", Local::now().format(TIMESTAMP_FORMAT), status, label);
        ctx.out(mode, &line);
    }

    if success {
        return HookOutcome::Succeeded;
    }

    let reason = match exit {
        ProcessExit::Interrupted => "interrupted".to_string(),
        other => format!("exit code {}", other.code()),
    };
    if item.halt_on_error {
        ctx.out(LineMode::Error, &format!("failed: {reason}"));
    }
    warn!(job = %ctx.job.id, hook = %phase, exit_code = exit.code(), halt = item.halt_on_error, "hook failed");

    HookOutcome::Failed {
        halt: item.halt_on_error,
        reason,
    }
}

async fn launch_hook(ctx: &mut RunContext, command: &str) -> ProcessExit {
    let launcher = Arc::clone(&ctx.services.launcher);
    let cancel = ctx.cancel_token().clone();
    let output = &mut ctx.io.output;

    let mut on_line = |line: ProcessLine| {
        let mode = match line.stream {
            OutputStream::Stdout => LineMode::Info,
            OutputStream::Stderr => LineMode::Error,
        };
        output.line(mode, &line.text);
    };

    launcher.launch(command, &[], &cancel, &mut on_line).await
}

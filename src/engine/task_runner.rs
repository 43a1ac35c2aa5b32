// src/engine/task_runner.rs

//! One task: `before` hook, rsync, outcome hook, `after` hook.

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::exec::{OutputStream, ParsedLine, ProcessExit, ProcessLine, ProgressParser};
use crate::history::HistoryStatus;
use crate::job::{HookSlot, Task, rsync_exit_label};
use crate::output::{LineMode, RunIo};

use super::hooks::{HookPhase, run_hook};
use super::RunContext;

/// Outcome of [`run_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    /// The sync exited nonzero or an executed hook failed.
    pub failed: bool,
    /// Whether the orchestrator should start the next task.
    pub continue_job: bool,
}

pub async fn run_task(ctx: &mut RunContext, task: &Task) -> TaskReport {
    let dry_run = ctx.dry_run || task.is_dry_run();
    let history = ctx.services.history.clone();

    history.record(&task.id, HistoryStatus::Started, Local::now(), dry_run);
    info!(job = %ctx.job.id, task = %task.id, dry_run, "task started");

    ctx.io
        .output
        .section_header(LineMode::Info, "start", "task", &task.name);
    ctx.io.progress.status(&format!("task {}", task.name));
    ctx.open_fold();

    let mut failed = false;

    let before = run_hook(ctx, &task.execute.before, HookPhase::task(HookSlot::Before)).await;
    failed |= before.is_failure();

    if !before.halts() && !ctx.is_interrupted() {
        let exit = run_sync(ctx, task, dry_run).await;
        if exit == ProcessExit::Interrupted {
            ctx.mark_interrupted();
        }

        let code = exit.code();
        let mode = if exit.success() {
            LineMode::Ok
        } else {
            LineMode::Warning
        };
        ctx.io
            .output
            .section_header(mode, "done", "rsync", &rsync_exit_label(code));

        let outcome_slot = if exit.success() {
            HookSlot::AfterOk
        } else {
            failed = true;
            warn!(job = %ctx.job.id, task = %task.id, exit_code = code, "rsync failed");
            HookSlot::AfterFail
        };

        let outcome = run_hook(
            ctx,
            task.execute.item(outcome_slot),
            HookPhase::task(outcome_slot),
        )
        .await;
        failed |= outcome.is_failure();

        if !outcome.halts() {
            let after = run_hook(ctx, &task.execute.after, HookPhase::task(HookSlot::After)).await;
            failed |= after.is_failure();
        }
    }

    let interrupted = ctx.is_interrupted();
    let terminal = if interrupted {
        HistoryStatus::Canceled
    } else {
        HistoryStatus::Done
    };
    history.record(&task.id, terminal, Local::now(), dry_run);

    ctx.close_fold();
    let end_mode = if failed || interrupted {
        LineMode::Warning
    } else {
        LineMode::Ok
    };
    ctx.io
        .output
        .section_header(end_mode, terminal.as_str(), "task", &task.name);

    if failed {
        ctx.failed_tasks += 1;
    }
    info!(job = %ctx.job.id, task = %task.id, failed, interrupted, "task finished");

    TaskReport {
        failed,
        continue_job: !interrupted && !(failed && task.execute.halt_job_on_error),
    }
}

async fn run_sync(ctx: &mut RunContext, task: &Task, dry_run: bool) -> ProcessExit {
    let launcher = Arc::clone(&ctx.services.launcher);
    let rsync = ctx.services.rsync_path.clone();
    let cancel = ctx.cancel_token().clone();
    let args = task.command(dry_run);

    ctx.out(LineMode::Info, &task.command_line(&rsync, dry_run));
    ctx.out(LineMode::Info, "");
    ctx.io.progress.indeterminate();

    let io = &mut ctx.io;
    let mut parser = ProgressParser::new();
    let mut on_line = |line: ProcessLine| route_sync_line(io, &mut parser, line);

    launcher.launch(&rsync, &args, &cancel, &mut on_line).await
}

fn route_sync_line(io: &mut RunIo, parser: &mut ProgressParser, line: ProcessLine) {
    if line.stream == OutputStream::Stderr {
        io.output.line(LineMode::Error, &line.text);
        return;
    }

    let parsed = parser.parse(&line.text);
    match parsed.line {
        ParsedLine::Blank => io.output.line(LineMode::Info, ""),
        ParsedLine::Content(text) => io.output.line(LineMode::Info, &text),
        ParsedLine::Deletion(text) => io.output.line(LineMode::Error, &text),
        ParsedLine::Progress(update) => io.progress.determinate(update.percent, &update.status),
    }
    if parsed.back_to_indeterminate {
        io.progress.indeterminate();
    }
}

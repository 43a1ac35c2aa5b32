// src/engine/orchestrator.rs

//! Drives one job execution from `started` to its terminal state.

use chrono::{Duration, Local};
use tracing::{error, info, warn};

use crate::errors::{EngineError, Result};
use crate::history::HistoryStatus;
use crate::job::HookSlot;
use crate::output::LineMode;
use crate::status::RunStatus;

use super::hooks::{HookPhase, run_hook};
use super::task_runner::run_task;
use super::{RunContext, RunReport, TerminalState};

const DRY_RUN_NOTICE: &str = "dry run: no changes were made except by hook scripts";

/// Run the job held by `ctx` to completion.
///
/// Terminal bookkeeping (history, run status, progress finish, summary) happens
/// exactly once, whatever path the run took.
pub async fn run_job(ctx: &mut RunContext) -> RunReport {
    let job_id = ctx.job.id.clone();
    info!(job = %job_id, dry_run = ctx.dry_run, tasks = ctx.job.tasks.len(), "job started");

    ctx.services
        .history
        .record(&job_id, HistoryStatus::Started, ctx.started_at, ctx.dry_run);

    let name = ctx.job.name.clone();
    ctx.io
        .output
        .section_header(LineMode::Info, "start", "job", &name);
    ctx.open_fold();

    if !ctx.job.tasks.is_empty() {
        ctx.out(LineMode::Info, "Tasks");
        let names: Vec<String> = ctx.job.tasks.iter().map(|t| t.name.clone()).collect();
        for task_name in names {
            ctx.out(LineMode::Info, &format!(" - {task_name}"));
        }
    }
    ctx.out(LineMode::Info, "");

    let steps = run_steps(ctx).await;
    let interrupted = ctx.is_interrupted();
    // Task failures that did not halt the job are reported, but the job
    // still counts as done.
    let terminal = match steps {
        Ok(_) if interrupted => TerminalState::Canceled,
        Ok(true) => TerminalState::Failed,
        Ok(false) => TerminalState::Done,
        Err(e) if interrupted => {
            warn!(job = %job_id, error = %e, "job halted after cancellation");
            TerminalState::Canceled
        }
        Err(e) => {
            error!(job = %job_id, error = %e, "job failed");
            ctx.out(LineMode::Error, "");
            ctx.out(LineMode::Error, &format!("Job failed: {e}"));
            TerminalState::Failed
        }
    };

    finish(ctx, terminal)
}

/// Job `before` hook, tasks, outcome hook, `after` hook.
///
/// Returns whether a failed task with `halt_job_on_error` stopped the job.
/// A halting job-level hook comes back as [`EngineError::Halted`]; hooks that
/// still apply after it (outcome and `after`) have run by then.
async fn run_steps(ctx: &mut RunContext) -> Result<bool> {
    let execute = ctx.job.execute.clone();
    let mut halted: Option<EngineError> = None;
    let mut task_halted = false;

    let before_phase = HookPhase::job(HookSlot::Before);
    let before = run_hook(ctx, &execute.before, before_phase).await;
    if let Some(err) = before.halted_error(before_phase) {
        warn!(job = %ctx.job.id, "job before hook halted; skipping tasks");
        halted = Some(err);
    }

    if halted.is_none() {
        let tasks = ctx.job.tasks.clone();
        for task in &tasks {
            if ctx.is_interrupted() {
                break;
            }
            let report = run_task(ctx, task).await;
            if !report.continue_job {
                if report.failed {
                    warn!(job = %ctx.job.id, task = %task.id, "task failed; halting job");
                    task_halted = true;
                }
                break;
            }
        }
    }

    if !ctx.job.tasks.is_empty() && !ctx.is_interrupted() {
        let slot = if ctx.failed_tasks == 0 && halted.is_none() {
            HookSlot::AfterOk
        } else {
            if ctx.failed_tasks > 0 {
                let text = format!("{} task(s) failed", ctx.failed_tasks);
                ctx.out(LineMode::Error, &text);
            }
            HookSlot::AfterFail
        };
        let phase = HookPhase::job(slot);
        let outcome = run_hook(ctx, execute.item(slot), phase).await;
        if halted.is_none() {
            halted = outcome.halted_error(phase);
        }
    }

    let after_phase = HookPhase::job(HookSlot::After);
    let after = run_hook(ctx, &execute.after, after_phase).await;
    if halted.is_none() {
        halted = after.halted_error(after_phase);
    }

    match halted {
        Some(err) => Err(err),
        None => Ok(task_halted),
    }
}

fn finish(ctx: &mut RunContext, terminal: TerminalState) -> RunReport {
    ctx.close_all_folds();

    let finished_at = Local::now();
    let exit_code = terminal.exit_code();
    ctx.services
        .history
        .record(&ctx.job.id, terminal.history_status(), finished_at, ctx.dry_run);

    ctx.job.last_run = Some(ctx.started_at);
    ctx.job.last_run_exit_code = Some(exit_code);
    let status = RunStatus {
        last_run: ctx.started_at,
        exit_code,
    };
    if let Err(e) = ctx.services.status.save(&ctx.job.id, status) {
        warn!(job = %ctx.job.id, error = %e, "failed to save run status");
    }

    ctx.io.progress.status(terminal.label());
    ctx.io.progress.finish();

    let elapsed = format_elapsed(finished_at - ctx.started_at);
    let subject = format!("{} ({})", ctx.job.name, elapsed);
    let mode = if terminal == TerminalState::Done && ctx.failed_tasks > 0 {
        LineMode::Warning
    } else {
        terminal.line_mode()
    };
    ctx.io
        .output
        .section_header(mode, terminal.label(), "job", &subject);
    if ctx.dry_run {
        ctx.out(LineMode::Warning, DRY_RUN_NOTICE);
    }

    info!(job = %ctx.job.id, exit_code, failed_tasks = ctx.failed_tasks, "job finished");

    RunReport {
        job_id: ctx.job.id.clone(),
        job_name: ctx.job.name.clone(),
        terminal,
        failed_tasks: ctx.failed_tasks,
        started_at: ctx.started_at,
        finished_at,
    }
}

/// `h:mm:ss`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_hours_minutes_seconds() {
        assert_eq!(format_elapsed(Duration::seconds(0)), "0:00:00");
        assert_eq!(format_elapsed(Duration::seconds(3723)), "1:02:03");
        assert_eq!(format_elapsed(Duration::seconds(-5)), "0:00:00");
    }
}

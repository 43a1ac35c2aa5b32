// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod history;
pub mod job;
pub mod logging;
pub mod output;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::{EngineServices, ExecutionSupervisor, RunOptions};
use crate::errors::Result;
use crate::exec::SystemLauncher;
use crate::history::HistoryRecorder;
use crate::job::Job;
use crate::output::RunIo;
use crate::status::TomlStatusStore;

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    match args.command {
        Command::Run { jobs, dry_run } => {
            run_jobs(&cfg, &jobs, dry_run || cfg.settings.dry_run).await
        }
        Command::List => {
            print_jobs(&cfg);
            Ok(0)
        }
        Command::History { id } => {
            print_history(&cfg, &id)?;
            Ok(0)
        }
    }
}

/// Start every job in `ids` concurrently and wait for all of them.
///
/// The result is the first nonzero job exit code, or 0.
async fn run_jobs(cfg: &ConfigFile, ids: &[String], dry_run: bool) -> Result<i32> {
    let status = Arc::new(TomlStatusStore::new(&cfg.settings.status_file));

    let mut jobs = Vec::new();
    for id in ids {
        if jobs.iter().any(|j: &Job| &j.id == id) {
            warn!(job = %id, "job given twice; running it once");
            continue;
        }
        jobs.push(cfg.job_with_status(id, status.as_ref())?);
    }

    let services = EngineServices::new(
        Arc::new(SystemLauncher),
        HistoryRecorder::new(&cfg.settings.history_file),
        status,
        cfg.settings.rsync_path.clone(),
    );
    let supervisor = ExecutionSupervisor::new(services);

    // Ctrl-C → cancel every active execution.
    {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received; cancelling active jobs");
            supervisor.cancel_all();
        });
    }

    let options = RunOptions { dry_run };
    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let io = RunIo::console(&job.name);
        handles.push(supervisor.start(job, io, options)?);
    }

    let mut exit_code = 0;
    for handle in handles {
        let report = handle.wait().await?;
        info!(
            job = %report.job_id,
            terminal = %report.terminal,
            exit_code = report.exit_code(),
            "job execution complete"
        );
        if exit_code == 0 {
            exit_code = report.exit_code();
        }
    }

    Ok(exit_code)
}

/// Print jobs, their tasks, each task's command and the last run status.
fn print_jobs(cfg: &ConfigFile) {
    let status = TomlStatusStore::new(&cfg.settings.status_file);
    let rsync = &cfg.settings.rsync_path;

    for id in cfg.job_ids() {
        let job = match cfg.job_with_status(id, &status) {
            Ok(job) => job,
            Err(e) => {
                warn!(job = %id, error = %e, "skipping job");
                continue;
            }
        };

        println!("{} ({})", job.id, job.name);
        match (job.last_run, job.last_run_exit_code) {
            (Some(when), Some(code)) => println!(
                "  last run: {} exit {}",
                when.format(history::TIMESTAMP_FORMAT),
                code
            ),
            _ => println!("  last run: never"),
        }
        println!("  tasks ({}):", job.tasks.len());
        for task in &job.tasks {
            println!("    - {} ({})", task.id, task.name);
            println!("        cmd: {}", task.command_line(rsync, task.is_dry_run()));
        }
    }

    debug!("listed jobs");
}

fn print_history(cfg: &ConfigFile, id: &str) -> Result<()> {
    let recorder = HistoryRecorder::new(&cfg.settings.history_file);
    let entries = recorder.entries_for(id)?;

    if entries.is_empty() {
        println!("no history for '{id}'");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} {:<8} {}{}",
            entry.timestamp,
            entry.status.as_str(),
            entry.entity_id,
            if entry.dry_run { history::DRY_RUN_SUFFIX } else { "" }
        );
    }
    Ok(())
}

// src/engine/supervisor.rs

//! Registry of active job executions.
//!
//! Each started job runs in its own Tokio task. A second start of the same job
//! id while the first is still registered is refused, so one job never has two
//! executions at the same time. A small monitor task awaits every worker,
//! removes it from the registry and hands the [`RunReport`] to the
//! [`RunHandle`]; a worker that panics is still reported as failed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{EngineError, Result};
use crate::history::HistoryStatus;
use crate::job::Job;
use crate::output::RunIo;
use crate::status::RunStatus;

use super::orchestrator::run_job;
use super::{EngineServices, JobId, RunContext, RunOptions, RunReport, TerminalState};

/// Internal handle for a registered execution.
#[derive(Debug)]
struct ActiveRun {
    cancel: CancellationToken,
    started_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct ExecutionSupervisor {
    active: Arc<Mutex<HashMap<JobId, ActiveRun>>>,
    services: Arc<EngineServices>,
}

impl ExecutionSupervisor {
    pub fn new(services: EngineServices) -> Self {
        Self {
            active: Arc::new(Mutex::new(HashMap::new())),
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &EngineServices {
        &self.services
    }

    /// Register `job` and spawn its worker.
    ///
    /// Fails with [`EngineError::AlreadyRunning`] if an execution of the same
    /// job id is still registered. Must be called from within a Tokio runtime.
    pub fn start(&self, job: Job, io: RunIo, options: RunOptions) -> Result<RunHandle> {
        let job_id = job.id.clone();
        let job_name = job.name.clone();
        let cancel = CancellationToken::new();

        let ctx = RunContext::new(job, options, io, Arc::clone(&self.services), cancel.clone());
        let started_at = ctx.started_at;

        {
            let mut active = self.registry();
            if active.contains_key(&job_id) {
                debug!(job = %job_id, "job already running; refusing second start");
                return Err(EngineError::AlreadyRunning(job_id));
            }
            active.insert(
                job_id.clone(),
                ActiveRun {
                    cancel: cancel.clone(),
                    started_at,
                },
            );
        }

        info!(job = %job_id, dry_run = options.dry_run, "starting job execution");

        let worker = tokio::spawn(async move {
            let mut ctx = ctx;
            run_job(&mut ctx).await
        });

        let (done_tx, done_rx) = oneshot::channel();
        let active = Arc::clone(&self.active);
        let services = Arc::clone(&self.services);
        let monitor_id = job_id.clone();

        tokio::spawn(async move {
            let report = match worker.await {
                Ok(report) => report,
                Err(e) => {
                    error!(job = %monitor_id, error = %e, "job worker aborted");
                    record_lost_worker(&services, &monitor_id, &job_name, started_at, options)
                }
            };

            lock_registry(&active).remove(&monitor_id);
            debug!(job = %monitor_id, exit_code = report.exit_code(), "job execution deregistered");

            // The handle may have been dropped; nobody is waiting then.
            let _ = done_tx.send(report);
        });

        Ok(RunHandle {
            job_id,
            cancel,
            done: done_rx,
        })
    }

    /// Request cancellation of the running execution of `job_id`.
    ///
    /// Returns `false` when no execution of that job is registered.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.registry().get(job_id) {
            Some(run) => {
                info!(job = %job_id, "cancelling job execution");
                run.cancel.cancel();
                true
            }
            None => {
                debug!(job = %job_id, "cancel requested for job that is not running");
                false
            }
        }
    }

    pub fn cancel_all(&self) {
        for (job_id, run) in self.registry().iter() {
            info!(job = %job_id, "cancelling job execution");
            run.cancel.cancel();
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.registry().contains_key(job_id)
    }

    /// Ids of registered executions with their start time, oldest first.
    pub fn active_jobs(&self) -> Vec<(JobId, DateTime<Local>)> {
        let mut jobs: Vec<_> = self
            .registry()
            .iter()
            .map(|(id, run)| (id.clone(), run.started_at))
            .collect();
        jobs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        jobs
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<JobId, ActiveRun>> {
        lock_registry(&self.active)
    }
}

fn lock_registry(
    active: &Mutex<HashMap<JobId, ActiveRun>>,
) -> MutexGuard<'_, HashMap<JobId, ActiveRun>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Terminal bookkeeping for a worker that never returned its report.
fn record_lost_worker(
    services: &EngineServices,
    job_id: &str,
    job_name: &str,
    started_at: DateTime<Local>,
    options: RunOptions,
) -> RunReport {
    let terminal = TerminalState::Failed;
    let finished_at = Local::now();

    services
        .history
        .record(job_id, HistoryStatus::Failed, finished_at, options.dry_run);

    let status = RunStatus {
        last_run: started_at,
        exit_code: terminal.exit_code(),
    };
    if let Err(e) = services.status.save(job_id, status) {
        warn!(job = %job_id, error = %e, "failed to save run status");
    }

    RunReport {
        job_id: job_id.to_string(),
        job_name: job_name.to_string(),
        terminal,
        failed_tasks: 0,
        started_at,
        finished_at,
    }
}

/// Handle to one started execution.
#[derive(Debug)]
pub struct RunHandle {
    job_id: JobId,
    cancel: CancellationToken,
    done: oneshot::Receiver<RunReport>,
}

impl RunHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Same as [`ExecutionSupervisor::cancel`] for this execution.
    pub fn cancel(&self) {
        info!(job = %self.job_id, "cancelling job execution");
        self.cancel.cancel();
    }

    /// Wait for the execution to finish. The run is deregistered by the time
    /// this returns.
    pub async fn wait(self) -> Result<RunReport> {
        let RunHandle { job_id, done, .. } = self;
        done.await.map_err(|_| EngineError::WorkerLost(job_id))
    }
}

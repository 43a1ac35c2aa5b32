#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use rsyncjob::engine::{EngineServices, ExecutionSupervisor, RunOptions, RunReport};
use rsyncjob::history::{HistoryEntry, HistoryRecorder};
use rsyncjob::job::Job;
use rsyncjob::output::{RecordingProgress, RecordingSink, RunIo};
use rsyncjob::status::MemoryStatusStore;

pub use rsyncjob_test_utils::builders::{JobBuilder, TaskBuilder, hook, hook_script};
pub use rsyncjob_test_utils::fake_launcher::{Script, ScriptedLauncher};
pub use rsyncjob_test_utils::{init_tracing, with_timeout};

pub const RSYNC: &str = "/usr/bin/rsync";

/// A supervisor wired to a scripted launcher, an in-memory status store and a
/// history file inside a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub launcher: ScriptedLauncher,
    pub status: MemoryStatusStore,
    pub output: RecordingSink,
    pub progress: RecordingProgress,
    pub supervisor: ExecutionSupervisor,
}

impl Harness {
    pub fn new(launcher: ScriptedLauncher) -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("tempdir");
        let status = MemoryStatusStore::new();
        let services = EngineServices::new(
            Arc::new(launcher.clone()),
            HistoryRecorder::new(dir.path().join("history")),
            Arc::new(status.clone()),
            RSYNC,
        );

        Self {
            dir,
            launcher,
            status,
            output: RecordingSink::new(),
            progress: RecordingProgress::new(),
            supervisor: ExecutionSupervisor::new(services),
        }
    }

    /// Executable hook script in the temp dir. The scripted launcher decides
    /// what running it does; the file only has to exist.
    pub fn script(&self, name: &str) -> PathBuf {
        hook_script(self.dir.path(), name, "exit 0")
    }

    pub fn io(&self) -> RunIo {
        RunIo::new(self.output.clone(), self.progress.clone())
    }

    pub async fn run(&self, job: Job) -> RunReport {
        self.run_with(job, RunOptions::default()).await
    }

    pub async fn run_with(&self, job: Job, options: RunOptions) -> RunReport {
        let handle = self
            .supervisor
            .start(job, self.io(), options)
            .expect("job starts");
        with_timeout(handle.wait()).await.expect("job reports")
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        HistoryRecorder::new(self.dir.path().join("history"))
            .entries()
            .expect("history readable")
    }

    /// `(entity, status)` pairs in file order.
    pub fn history_pairs(&self) -> Vec<(String, String)> {
        self.history()
            .into_iter()
            .map(|e| (e.entity_id, e.status.as_str().to_string()))
            .collect()
    }

    /// File names of the hook scripts launched so far, in launch order.
    pub fn hooks_run(&self) -> Vec<String> {
        self.launcher
            .invocations()
            .into_iter()
            .filter(|i| i.program != RSYNC)
            .map(|i| {
                PathBuf::from(&i.program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(i.program)
            })
            .collect()
    }

    /// Number of rsync launches so far.
    pub fn syncs_run(&self) -> usize {
        self.launcher
            .invocations()
            .iter()
            .filter(|i| i.program == RSYNC)
            .count()
    }
}

pub fn pair(entity: &str, status: &str) -> (String, String) {
    (entity.to_string(), status.to_string())
}

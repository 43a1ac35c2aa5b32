use std::fs;
use std::path::{Path, PathBuf};

use rsyncjob::job::{ExecuteItem, ExecuteSection, Job, Task, TaskExecuteSection};

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// A task syncing `/src/<id>/` to `/dst/<id>/` with no hooks.
    pub fn new(id: &str) -> Self {
        Self {
            task: Task {
                id: id.to_string(),
                name: id.to_string(),
                source: format!("/src/{id}/"),
                destination: format!("/dst/{id}/"),
                options: vec![],
                excludes: vec![],
                dry_run: false,
                execute: TaskExecuteSection::default(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.task.source = source.to_string();
        self
    }

    pub fn destination(mut self, destination: &str) -> Self {
        self.task.destination = destination.to_string();
        self
    }

    pub fn option(mut self, option: &str) -> Self {
        self.task.options.push(option.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.excludes.push(pattern.to_string());
        self
    }

    pub fn dry_run(mut self, val: bool) -> Self {
        self.task.dry_run = val;
        self
    }

    pub fn before(mut self, item: ExecuteItem) -> Self {
        self.task.execute.before = item;
        self
    }

    pub fn after_ok(mut self, item: ExecuteItem) -> Self {
        self.task.execute.after_ok = item;
        self
    }

    pub fn after_fail(mut self, item: ExecuteItem) -> Self {
        self.task.execute.after_fail = item;
        self
    }

    pub fn after(mut self, item: ExecuteItem) -> Self {
        self.task.execute.after = item;
        self
    }

    pub fn halt_job_on_error(mut self, val: bool) -> Self {
        self.task.execute.halt_job_on_error = val;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for `Job`.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            job: Job {
                id: id.to_string(),
                name: id.to_string(),
                tasks: vec![],
                execute: ExecuteSection::default(),
                last_run: None,
                last_run_exit_code: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.job.name = name.to_string();
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.job.tasks.push(task);
        self
    }

    pub fn before(mut self, item: ExecuteItem) -> Self {
        self.job.execute.before = item;
        self
    }

    pub fn after_ok(mut self, item: ExecuteItem) -> Self {
        self.job.execute.after_ok = item;
        self
    }

    pub fn after_fail(mut self, item: ExecuteItem) -> Self {
        self.job.execute.after_fail = item;
        self
    }

    pub fn after(mut self, item: ExecuteItem) -> Self {
        self.job.execute.after = item;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// Write an executable `sh` script named `name` into `dir` and return its path.
pub fn hook_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write hook script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("make hook script executable");
    }

    path
}

/// An enabled hook item for `path`.
pub fn hook(path: &Path, halt_on_error: bool) -> ExecuteItem {
    ExecuteItem::new(path.to_string_lossy(), halt_on_error)
}

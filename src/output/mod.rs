// src/output/mod.rs

//! Output and progress collaborators of a job execution.
//!
//! The engine only emits tagged lines, section headers and fold markers; how
//! they are shown is up to the sink. [`console`] renders them on a terminal,
//! [`memory`] records them for tests.

use std::fmt::Debug;

pub mod console;
pub mod memory;

pub use console::{ConsoleSink, LogProgress};
pub use memory::{OutputEvent, ProgressEvent, RecordingProgress, RecordingSink};

/// Severity tag of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Info,
    Ok,
    Warning,
    Error,
}

/// Receives the console output of one job execution.
pub trait OutputSink: Send + Debug {
    fn line(&mut self, mode: LineMode, text: &str);

    /// A banner such as `START task 'home'` or `DONE rsync 'success'`.
    fn section_header(&mut self, mode: LineMode, action: &str, kind: &str, subject: &str);

    /// Open a nested group of lines. The job fold is level 1, task folds are
    /// level 2.
    fn fold_start(&mut self, level: usize);

    fn fold_end(&mut self, level: usize);
}

/// Receives progress updates of one job execution.
pub trait ProgressSink: Send + Debug {
    /// No percentage is known (between files, hooks running).
    fn indeterminate(&mut self);

    /// Bounded progress, `percent` in `0..=100`.
    fn determinate(&mut self, percent: u8, status: &str);

    /// Free status text, e.g. `done` when the job ends.
    fn status(&mut self, text: &str);

    fn finish(&mut self);
}

/// The pair of sinks owned by one execution.
#[derive(Debug)]
pub struct RunIo {
    pub output: Box<dyn OutputSink>,
    pub progress: Box<dyn ProgressSink>,
}

impl RunIo {
    pub fn new(output: impl OutputSink + 'static, progress: impl ProgressSink + 'static) -> Self {
        Self {
            output: Box::new(output),
            progress: Box::new(progress),
        }
    }

    /// Terminal output prefixed with the job name, progress through `tracing`.
    pub fn console(job_name: &str) -> Self {
        Self::new(ConsoleSink::new(job_name), LogProgress::new(job_name))
    }
}

// src/output/console.rs

use std::io::Write;

use chrono::Local;
use tracing::{debug, info};

use super::{LineMode, OutputSink, ProgressSink};

const HEADER_WIDTH: usize = 80;

/// Writes job output to the terminal.
///
/// Info/ok lines go to stdout, warning/error lines to stderr. Every line is
/// prefixed with `[job name]` so concurrent jobs stay readable, and indented by
/// the current fold depth.
#[derive(Debug)]
pub struct ConsoleSink {
    prefix: String,
    depth: usize,
}

impl ConsoleSink {
    pub fn new(job_name: &str) -> Self {
        Self {
            prefix: format!("[{job_name}]"),
            depth: 0,
        }
    }

    fn write(&self, mode: LineMode, text: &str) {
        let indent = "  ".repeat(self.depth);
        let line = format!("{} {}{}\n", self.prefix, indent, text);
        // Console write errors (closed pipe) are not worth failing a backup for.
        let _ = match mode {
            LineMode::Info | LineMode::Ok => std::io::stdout().lock().write_all(line.as_bytes()),
            LineMode::Warning | LineMode::Error => {
                std::io::stderr().lock().write_all(line.as_bytes())
            }
        };
    }
}

impl OutputSink for ConsoleSink {
    fn line(&mut self, mode: LineMode, text: &str) {
        self.write(mode, text);
    }

    fn section_header(&mut self, mode: LineMode, action: &str, kind: &str, subject: &str) {
        let text = format!(
            "----   {} {} {} '{}'   ",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            action.to_uppercase(),
            kind,
            subject
        );
        let padding = HEADER_WIDTH.saturating_sub(text.chars().count());
        self.write(mode, &format!("{}{}", text, "-".repeat(padding)));
    }

    fn fold_start(&mut self, level: usize) {
        self.depth = level;
    }

    fn fold_end(&mut self, level: usize) {
        self.depth = level.saturating_sub(1);
    }
}

/// Reports progress through `tracing`: status changes at info, percentages at
/// debug.
#[derive(Debug)]
pub struct LogProgress {
    job: String,
    last_percent: Option<u8>,
}

impl LogProgress {
    pub fn new(job_name: &str) -> Self {
        Self {
            job: job_name.to_string(),
            last_percent: None,
        }
    }
}

impl ProgressSink for LogProgress {
    fn indeterminate(&mut self) {
        self.last_percent = None;
    }

    fn determinate(&mut self, percent: u8, status: &str) {
        if self.last_percent != Some(percent) {
            debug!(job = %self.job, percent, status, "progress");
            self.last_percent = Some(percent);
        }
    }

    fn status(&mut self, text: &str) {
        info!(job = %self.job, status = text, "job status");
    }

    fn finish(&mut self) {
        self.last_percent = None;
    }
}

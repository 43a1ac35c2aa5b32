// src/output/memory.rs

use std::sync::{Arc, Mutex};

use super::{LineMode, OutputSink, ProgressSink};

/// Everything an [`OutputSink`] can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Line { mode: LineMode, text: String },
    Header {
        mode: LineMode,
        action: String,
        kind: String,
        subject: String,
    },
    FoldStart(usize),
    FoldEnd(usize),
}

/// Records output events in memory. Clones share the same buffer, so a test
/// can keep one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Text of every line with the given mode.
    pub fn lines(&self, mode: LineMode) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                OutputEvent::Line { mode: m, text } if m == mode => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn contains_line(&self, needle: &str) -> bool {
        self.events().iter().any(|e| match e {
            OutputEvent::Line { text, .. } => text.contains(needle),
            _ => false,
        })
    }

    fn push(&self, event: OutputEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl OutputSink for RecordingSink {
    fn line(&mut self, mode: LineMode, text: &str) {
        self.push(OutputEvent::Line {
            mode,
            text: text.to_string(),
        });
    }

    fn section_header(&mut self, mode: LineMode, action: &str, kind: &str, subject: &str) {
        self.push(OutputEvent::Header {
            mode,
            action: action.to_string(),
            kind: kind.to_string(),
            subject: subject.to_string(),
        });
    }

    fn fold_start(&mut self, level: usize) {
        self.push(OutputEvent::FoldStart(level));
    }

    fn fold_end(&mut self, level: usize) {
        self.push(OutputEvent::FoldEnd(level));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Indeterminate,
    Determinate { percent: u8, status: String },
    Status(String),
    Finish,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl ProgressSink for RecordingProgress {
    fn indeterminate(&mut self) {
        self.push(ProgressEvent::Indeterminate);
    }

    fn determinate(&mut self, percent: u8, status: &str) {
        self.push(ProgressEvent::Determinate {
            percent,
            status: status.to_string(),
        });
    }

    fn status(&mut self, text: &str) {
        self.push(ProgressEvent::Status(text.to_string()));
    }

    fn finish(&mut self) {
        self.push(ProgressEvent::Finish);
    }
}

// src/exec/progress.rs

//! rsync output classification.
//!
//! With `--progress` rsync prints the name of each file, then rewrites a
//! progress line for it:
//!
//! ```text
//! photos/2024/img_0001.jpg
//!       1,048,576  45%   12.34MB/s    0:00:05
//!       2,330,112 100%   12.40MB/s    0:00:00 (xfr#1, to-chk=41/43)
//! deleting photos/old.jpg
//! ```
//!
//! [`ProgressParser`] turns each line into a [`ParsedLine`] the task runner can
//! route: content to standard output, deletions to the error sink, progress
//! to the progress sink.

use std::sync::LazyLock;

use regex::Regex;

/// `<bytes> <pct>%[ <rate>[ <h:mm:ss>]]`, anything after is ignored.
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(\d[\d,.]*[KMGTP]?)\s+(\d{1,3})%(?:\s+(\S+))?(?:\s+(\d+:\d{2}:\d{2}))?")
        .expect("progress regex is valid")
});

const TRANSFER_MARKER: &str = "(xfr#";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// `0..=100`.
    pub percent: u8,
    /// Previous content line (usually the file name) plus `"<pct>% <rate> <eta>"`
    /// (rate and eta when rsync printed them).
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Blank,
    /// A normal line, forwarded unchanged.
    Content(String),
    /// `deleting <path>`, shown apart from normal output.
    Deletion(String),
    /// Not forwarded as text.
    Progress(ProgressUpdate),
}

/// Outcome of [`ProgressParser::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub line: ParsedLine,
    /// The line finished a file transfer; progress is indeterminate until the
    /// next percentage arrives.
    pub back_to_indeterminate: bool,
}

/// Stateful classifier, one per rsync invocation.
#[derive(Debug)]
pub struct ProgressParser {
    prev_line: String,
    indeterminate: bool,
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressParser {
    pub fn new() -> Self {
        Self {
            prev_line: String::new(),
            indeterminate: true,
        }
    }

    /// Whether no percentage is currently known.
    pub fn is_indeterminate(&self) -> bool {
        self.indeterminate
    }

    pub fn parse(&mut self, line: &str) -> Parsed {
        let parsed = if line.trim().is_empty() {
            ParsedLine::Blank
        } else if line.starts_with("deleting ") || line.starts_with("*deleting ") {
            ParsedLine::Deletion(line.to_string())
        } else if let Some(update) = self.progress(line) {
            self.indeterminate = false;
            ParsedLine::Progress(update)
        } else {
            self.prev_line = line.to_string();
            ParsedLine::Content(line.to_string())
        };

        let back_to_indeterminate = line.contains(TRANSFER_MARKER);
        if back_to_indeterminate {
            self.indeterminate = true;
        }

        Parsed {
            line: parsed,
            back_to_indeterminate,
        }
    }

    fn progress(&self, line: &str) -> Option<ProgressUpdate> {
        let caps = PROGRESS_RE.captures(line)?;
        let percent: u8 = caps[2].parse().ok().filter(|p| *p <= 100)?;
        let mut progress = format!("{}%", percent);
        for part in [caps.get(3), caps.get(4)].into_iter().flatten() {
            progress.push(' ');
            progress.push_str(part.as_str());
        }

        let status = if self.prev_line.is_empty() {
            progress
        } else {
            format!("{} {}", self.prev_line, progress)
        };

        Some(ProgressUpdate { percent, status })
    }
}

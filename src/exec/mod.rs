// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running hook scripts and the rsync
//! binary, using `tokio::process::Command`, and for making sense of rsync's
//! output.
//!
//! - [`process`] provides the `ProcessLauncher` trait and the production
//!   `SystemLauncher`. Tests replace the launcher with a scripted fake.
//! - [`progress`] turns rsync output lines into content, deletions and
//!   progress percentages.

pub mod process;
pub mod progress;

pub use process::{
    INTERRUPTED_EXIT_CODE, LineHandler, OutputStream, ProcessExit, ProcessLauncher, ProcessLine,
    SystemLauncher,
};
pub use progress::{Parsed, ParsedLine, ProgressParser, ProgressUpdate};

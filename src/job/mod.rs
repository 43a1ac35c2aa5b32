// src/job/mod.rs

//! Resolved job and task definitions as the engine consumes them.
//!
//! - [`model`] holds `Job`, `Task` and the hook sections.
//! - [`command`] builds the rsync argument list for a task.
//! - [`exit_codes`] maps rsync exit codes to readable labels.

pub mod command;
pub mod exit_codes;
pub mod model;

pub use command::DRY_RUN_FLAG;
pub use exit_codes::rsync_exit_label;
pub use model::{ExecuteItem, ExecuteSection, HookSlot, Job, Task, TaskExecuteSection};

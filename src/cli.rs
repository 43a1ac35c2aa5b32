// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `rsyncjob`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rsyncjob",
    version,
    about = "Run rsync backup jobs with pre/post hook scripts.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Rsyncjob.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "Rsyncjob.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RSYNCJOB_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one or more jobs concurrently and wait for them to finish.
    Run {
        /// Job ids as they appear in `[job.<id>]`.
        #[arg(required = true, value_name = "JOB")]
        jobs: Vec<String>,

        /// Pass `--dry-run` to rsync for every task. Hook scripts still run.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print jobs, their tasks and the rsync command of each task.
    List,

    /// Print the recorded history of a job or task.
    History {
        #[arg(value_name = "ID")]
        id: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

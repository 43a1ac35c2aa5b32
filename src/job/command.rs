// src/job/command.rs

//! rsync argument list construction.

use crate::job::model::Task;

pub const DRY_RUN_FLAG: &str = "--dry-run";

impl Task {
    /// Build the argument list passed to the rsync binary:
    /// options, excludes, source, destination. `--dry-run` is prepended when
    /// `dry_run` is set. An argument already present is not added again.
    pub fn command(&self, dry_run: bool) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if dry_run {
            push_unique(&mut args, DRY_RUN_FLAG.to_string());
        }

        for option in self.options.iter().filter(|o| !o.trim().is_empty()) {
            push_unique(&mut args, option.trim().to_string());
        }

        for pattern in self.excludes.iter().filter(|p| !p.trim().is_empty()) {
            push_unique(&mut args, format!("--exclude={}", pattern.trim()));
        }

        push_unique(&mut args, sync_path(&self.source));
        push_unique(&mut args, sync_path(&self.destination));

        args
    }

    /// Whole command line as shown in the output console.
    pub fn command_line(&self, rsync_path: &str, dry_run: bool) -> String {
        let mut parts = vec![rsync_path.to_string()];
        parts.extend(self.command(dry_run));
        parts.join(" ")
    }
}

fn push_unique(args: &mut Vec<String>, arg: String) {
    if !args.contains(&arg) {
        args.push(arg);
    }
}

/// rsync builds for Windows run on cygwin and expect `/cygdrive/c/...` paths.
fn sync_path(path: &str) -> String {
    if cfg!(windows) {
        cygdrive_path(path)
    } else {
        path.to_string()
    }
}

pub(crate) fn cygdrive_path(path: &str) -> String {
    format!("/cygdrive/{}", path.replace(':', "").replace('\\', "/"))
}

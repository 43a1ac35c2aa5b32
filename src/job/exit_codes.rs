// src/job/exit_codes.rs

//! Readable labels for rsync exit codes (see `EXIT VALUES` in rsync(1)).

use std::borrow::Cow;

const RSYNC_EXIT_LABELS: &[(i32, &str)] = &[
    (0, "success"),
    (1, "syntax or usage error"),
    (2, "protocol incompatibility"),
    (3, "errors selecting input/output files, dirs"),
    (4, "requested action not supported"),
    (5, "error starting client-server protocol"),
    (6, "daemon unable to append to log-file"),
    (10, "error in socket I/O"),
    (11, "error in file I/O"),
    (12, "error in rsync protocol data stream"),
    (13, "errors with program diagnostics"),
    (14, "error in IPC code"),
    (20, "received SIGUSR1 or SIGINT"),
    (21, "some error returned by waitpid()"),
    (22, "error allocating core memory buffers"),
    (23, "partial transfer due to error"),
    (24, "partial transfer due to vanished source files"),
    (25, "the --max-delete limit stopped deletions"),
    (30, "timeout in data send/receive"),
    (35, "timeout waiting for daemon connection"),
];

pub fn rsync_exit_label(code: i32) -> Cow<'static, str> {
    RSYNC_EXIT_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| Cow::Borrowed(*label))
        .unwrap_or_else(|| Cow::Owned(format!("system code {code}")))
}

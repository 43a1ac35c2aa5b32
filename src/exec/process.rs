// src/exec/process.rs

//! Single external process runner.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Exit code reported for interrupted runs and runs that could not be
/// started or waited on.
pub const INTERRUPTED_EXIT_CODE: i32 = -1;

/// How long output is still collected after the process has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of child output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLine {
    pub stream: OutputStream,
    pub text: String,
}

impl ProcessLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// How a process run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// The process exited on its own. Signal deaths report
    /// [`INTERRUPTED_EXIT_CODE`].
    Exited(i32),
    /// The run's cancellation token fired; the child was killed.
    Interrupted,
    /// The process could not be spawned or waited on.
    Failed,
}

impl ProcessExit {
    pub fn code(&self) -> i32 {
        match self {
            ProcessExit::Exited(code) => *code,
            ProcessExit::Interrupted | ProcessExit::Failed => INTERRUPTED_EXIT_CODE,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ProcessExit::Exited(0))
    }
}

pub type LineHandler<'a> = dyn FnMut(ProcessLine) + Send + 'a;

/// Trait abstracting how external processes are run.
///
/// Production code uses [`SystemLauncher`]; tests can provide their own
/// implementation that replays scripted output without spawning anything.
pub trait ProcessLauncher: Send + Sync {
    /// Run `program` with `args`, passing every output line to `on_line` in
    /// the order produced. Completes when the process exits or `cancel` fires.
    /// Never returns an error: spawn problems become [`ProcessExit::Failed`]
    /// plus one synthetic stderr line.
    fn launch<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cancel: &'a CancellationToken,
        on_line: &'a mut LineHandler<'a>,
    ) -> Pin<Box<dyn Future<Output = ProcessExit> + Send + 'a>>;
}

/// Real launcher used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cancel: &'a CancellationToken,
        on_line: &'a mut LineHandler<'a>,
    ) -> Pin<Box<dyn Future<Output = ProcessExit> + Send + 'a>> {
        Box::pin(run_process(program, args, cancel, on_line))
    }
}

async fn run_process(
    program: &str,
    args: &[String],
    cancel: &CancellationToken,
    on_line: &mut LineHandler<'_>,
) -> ProcessExit {
    if cancel.is_cancelled() {
        debug!(program, "run already cancelled; not spawning");
        return ProcessExit::Interrupted;
    }

    info!(program, ?args, "starting process");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program, error = %e, "failed to spawn process");
            on_line(ProcessLine::stderr(format!("failed to start '{}': {}", program, e)));
            return ProcessExit::Failed;
        }
    };

    // Both pipes feed one channel so the handler sees lines in arrival order.
    let (tx, mut rx) = mpsc::unbounded_channel::<ProcessLine>();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, OutputStream::Stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, OutputStream::Stderr, tx.clone())));
    }
    drop(tx);

    let mut pipes_open = true;
    let status = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                abort_readers(&readers);
                return kill(program, &mut child).await;
            }

            line = rx.recv(), if pipes_open => match line {
                Some(line) => on_line(line),
                None => pipes_open = false,
            },

            status = child.wait() => break status,
        }
    };

    // Background processes started by the child may still hold the pipes.
    // Take what arrives shortly after exit, then stop reading.
    if pipes_open {
        let drained = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async {
            while let Some(line) = rx.recv().await {
                on_line(line);
            }
        })
        .await;
        if drained.is_err() {
            debug!(program, "output still open after exit; detaching readers");
        }
    }
    abort_readers(&readers);

    match status {
        Ok(status) => {
            let code = status.code().unwrap_or(INTERRUPTED_EXIT_CODE);
            info!(program, exit_code = code, success = status.success(), "process exited");
            ProcessExit::Exited(code)
        }
        Err(e) => {
            warn!(program, error = %e, "failed to wait for process");
            on_line(ProcessLine::stderr(format!("failed to wait for '{}': {}", program, e)));
            ProcessExit::Failed
        }
    }
}

fn abort_readers(readers: &[JoinHandle<()>]) {
    for reader in readers {
        reader.abort();
    }
}

async fn kill(program: &str, child: &mut Child) -> ProcessExit {
    info!(program, "cancellation requested; killing process");
    if let Err(e) = child.kill().await {
        warn!(program, error = %e, "failed to kill cancelled process");
    }
    ProcessExit::Interrupted
}

/// Read `reader` to the end, sending one [`ProcessLine`] per line.
///
/// rsync rewrites its progress line in place with `\r`, so carriage returns
/// end a line just like `\n` does.
async fn forward_lines<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<ProcessLine>)
where
    R: AsyncRead + Unpin,
{
    let mut chunks = BufReader::new(reader).split(b'\n');

    while let Ok(Some(chunk)) = chunks.next_segment().await {
        let text = String::from_utf8_lossy(&chunk);
        for line in split_carriage_returns(&text) {
            if tx
                .send(ProcessLine {
                    stream,
                    text: line.to_string(),
                })
                .is_err()
            {
                return;
            }
        }
    }
}

/// Split a `\n`-terminated chunk on `\r`. Empty pieces produced by `\r\n` or a
/// trailing `\r` are dropped, but a chunk that is blank to begin with is kept
/// as one blank line.
pub(crate) fn split_carriage_returns(chunk: &str) -> Vec<&str> {
    if !chunk.contains('\r') {
        return vec![chunk];
    }
    let pieces: Vec<&str> = chunk.split('\r').filter(|p| !p.is_empty()).collect();
    if pieces.is_empty() { vec![""] } else { pieces }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rsyncjob::exec::{LineHandler, ProcessExit, ProcessLauncher, ProcessLine};

/// What a scripted process does once launched.
#[derive(Debug, Clone)]
pub struct Script {
    lines: Vec<ProcessLine>,
    end: ScriptEnd,
}

#[derive(Debug, Clone)]
enum ScriptEnd {
    Exit(i32),
    /// Block until the run is cancelled.
    Hang,
    /// Behave like a program that could not be spawned.
    SpawnFailure(String),
}

impl Script {
    pub fn exit(code: i32) -> Self {
        Self {
            lines: vec![],
            end: ScriptEnd::Exit(code),
        }
    }

    pub fn hang() -> Self {
        Self {
            lines: vec![],
            end: ScriptEnd::Hang,
        }
    }

    pub fn spawn_failure(message: &str) -> Self {
        Self {
            lines: vec![],
            end: ScriptEnd::SpawnFailure(message.to_string()),
        }
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.lines.push(ProcessLine::stdout(text));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.lines.push(ProcessLine::stderr(text));
        self
    }
}

/// One recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn mentions(&self, needle: &str) -> bool {
        self.program.contains(needle) || self.args.iter().any(|a| a.contains(needle))
    }
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    script: Script,
}

/// A fake launcher that:
/// - records every program it was asked to run, with its arguments
/// - replays the first scripted outcome whose needle appears in the program
///   path or one of the arguments; unmatched launches exit 0 silently.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    rules: Arc<Mutex<Vec<Rule>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script launches whose program or arguments contain `needle`.
    pub fn on(self, needle: &str, script: Script) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            script,
        });
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Whether any launch mentioned `needle`.
    pub fn launched(&self, needle: &str) -> bool {
        self.invocations().iter().any(|i| i.mentions(needle))
    }

    /// Poll until a launch mentioning `needle` has been recorded.
    pub async fn wait_for_launch(&self, needle: &str) {
        while !self.launched(needle) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn script_for(&self, invocation: &Invocation) -> Script {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| invocation.mentions(&rule.needle))
            .map(|rule| rule.script.clone())
            .unwrap_or_else(|| Script::exit(0))
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cancel: &'a CancellationToken,
        on_line: &'a mut LineHandler<'a>,
    ) -> Pin<Box<dyn Future<Output = ProcessExit> + Send + 'a>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return ProcessExit::Interrupted;
            }

            let invocation = Invocation {
                program: program.to_string(),
                args: args.to_vec(),
            };
            let script = self.script_for(&invocation);
            self.invocations.lock().unwrap().push(invocation);

            if let ScriptEnd::SpawnFailure(message) = &script.end {
                on_line(ProcessLine::stderr(message.clone()));
                return ProcessExit::Failed;
            }

            for line in script.lines {
                on_line(line);
            }

            match script.end {
                ScriptEnd::Exit(code) => ProcessExit::Exited(code),
                ScriptEnd::Hang | ScriptEnd::SpawnFailure(_) => {
                    cancel.cancelled().await;
                    ProcessExit::Interrupted
                }
            }
        })
    }
}

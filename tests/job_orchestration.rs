mod common;
use crate::common::{
    Harness, JobBuilder, RSYNC, Script, ScriptedLauncher, TaskBuilder, hook, pair,
};

use std::error::Error;

use rsyncjob::engine::{RunOptions, TerminalState};
use rsyncjob::output::{LineMode, OutputEvent, ProgressEvent};
use rsyncjob::status::RunStatusStore;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn job_without_tasks_runs_before_and_after_hooks() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let before = h.script("job_before.sh");
    let after_ok = h.script("job_after_ok.sh");
    let after = h.script("job_after.sh");

    let job = JobBuilder::new("empty")
        .before(hook(&before, true))
        .after_ok(hook(&after_ok, false))
        .after(hook(&after, false))
        .build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(report.exit_code(), 0);
    // Outcome hooks only apply to jobs with tasks.
    assert_eq!(h.hooks_run(), vec!["job_before.sh", "job_after.sh"]);
    assert_eq!(h.syncs_run(), 0);
    assert_eq!(
        h.history_pairs(),
        vec![pair("empty", "started"), pair("empty", "done")]
    );
    Ok(())
}

#[tokio::test]
async fn successful_sync_runs_after_ok_only() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let task = TaskBuilder::new("photos")
        .after_ok(hook(&h.script("photos_ok.sh"), false))
        .after_fail(hook(&h.script("photos_fail.sh"), false))
        .after(hook(&h.script("photos_after.sh"), false))
        .build();
    let job = JobBuilder::new("home").task(task).build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(report.failed_tasks, 0);
    assert_eq!(h.hooks_run(), vec!["photos_ok.sh", "photos_after.sh"]);
    assert_eq!(
        h.history_pairs(),
        vec![
            pair("home", "started"),
            pair("photos", "started"),
            pair("photos", "done"),
            pair("home", "done"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_sync_runs_after_fail_only() -> TestResult {
    let launcher = ScriptedLauncher::new().on("/src/photos/", Script::exit(23));
    let h = Harness::new(launcher);
    let task = TaskBuilder::new("photos")
        .after_ok(hook(&h.script("photos_ok.sh"), false))
        .after_fail(hook(&h.script("photos_fail.sh"), false))
        .after(hook(&h.script("photos_after.sh"), false))
        .build();
    let job = JobBuilder::new("home").task(task).build();

    let report = h.run(job).await;

    // The task did not halt the job, so the job itself still ends done.
    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(h.hooks_run(), vec!["photos_fail.sh", "photos_after.sh"]);

    let headers: Vec<_> = h
        .output
        .events()
        .into_iter()
        .filter_map(|e| match e {
            OutputEvent::Header { mode, kind, subject, .. } if kind == "rsync" => {
                Some((mode, subject))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        headers,
        vec![(LineMode::Warning, "partial transfer due to error".to_string())]
    );
    assert!(h.output.lines(LineMode::Error).contains(&"1 task(s) failed".to_string()));
    // Failed tasks alone do not produce the halt banner.
    assert!(!h.output.contains_line("Job failed"));
    assert_eq!(h.history_pairs().last(), Some(&pair("home", "done")));

    let summary = h.output.events().into_iter().rev().find_map(|e| match e {
        OutputEvent::Header { mode, action, kind, .. } if kind == "job" => Some((mode, action)),
        _ => None,
    });
    assert_eq!(summary, Some((LineMode::Warning, "done".to_string())));
    Ok(())
}

#[tokio::test]
async fn nightly_halting_task_stops_job_but_job_failure_hooks_run() -> TestResult {
    let launcher = ScriptedLauncher::new().on("/src/first/", Script::exit(1));
    let h = Harness::new(launcher);

    let first = TaskBuilder::new("first")
        .after_fail(hook(&h.script("first_after_fail.sh"), false))
        .halt_job_on_error(true)
        .build();
    let second = TaskBuilder::new("second")
        .before(hook(&h.script("second_before.sh"), false))
        .build();
    let job = JobBuilder::new("nightly")
        .name("Nightly")
        .task(first)
        .task(second)
        .after_ok(hook(&h.script("job_after_ok.sh"), false))
        .after_fail(hook(&h.script("job_after_fail.sh"), false))
        .after(hook(&h.script("job_after.sh"), false))
        .build();

    let report = h.run(job).await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(
        h.hooks_run(),
        vec!["first_after_fail.sh", "job_after_fail.sh", "job_after.sh"]
    );
    assert_eq!(h.syncs_run(), 1);
    assert_eq!(
        h.history_pairs(),
        vec![
            pair("nightly", "started"),
            pair("first", "started"),
            pair("first", "done"),
            pair("nightly", "failed"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failing_task_without_halt_lets_later_tasks_run() -> TestResult {
    let launcher = ScriptedLauncher::new().on("/src/first/", Script::exit(1));
    let h = Harness::new(launcher);
    let job = JobBuilder::new("nightly")
        .task(TaskBuilder::new("first").build())
        .task(TaskBuilder::new("second").build())
        .build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(h.syncs_run(), 2);
    Ok(())
}

#[tokio::test]
async fn halting_job_before_hook_skips_tasks_and_fails_job() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new().on("mount.sh", Script::exit(2)));
    let job = JobBuilder::new("offsite")
        .task(TaskBuilder::new("docs").build())
        .before(hook(&h.script("mount.sh"), true))
        .after_fail(hook(&h.script("job_after_fail.sh"), false))
        .after(hook(&h.script("job_after.sh"), false))
        .build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Failed);
    assert_eq!(h.syncs_run(), 0);
    assert_eq!(
        h.hooks_run(),
        vec!["mount.sh", "job_after_fail.sh", "job_after.sh"]
    );
    assert!(h.output.contains_line("failed: exit code 2"));
    assert!(h.output.contains_line("Job failed: 'job before' failed: exit code 2"));
    assert_eq!(
        h.history_pairs(),
        vec![pair("offsite", "started"), pair("offsite", "failed")]
    );
    Ok(())
}

#[tokio::test]
async fn non_halting_job_hook_failure_keeps_job_done() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new().on("notify.sh", Script::exit(1)));
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").build())
        .before(hook(&h.script("notify.sh"), false))
        .build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(h.syncs_run(), 1);
    assert!(h.output.lines(LineMode::Error).iter().any(|l| l.ends_with("ERROR 'job before'")));
    Ok(())
}

#[tokio::test]
async fn halting_task_before_hook_skips_sync_and_remaining_hooks() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new().on("check.sh", Script::exit(3)));
    let task = TaskBuilder::new("docs")
        .before(hook(&h.script("check.sh"), true))
        .after_fail(hook(&h.script("docs_fail.sh"), false))
        .after(hook(&h.script("docs_after.sh"), false))
        .build();
    let job = JobBuilder::new("home").task(task).build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(h.syncs_run(), 0);
    assert_eq!(h.hooks_run(), vec!["check.sh"]);
    assert_eq!(
        h.history_pairs(),
        vec![
            pair("home", "started"),
            pair("docs", "started"),
            pair("docs", "done"),
            pair("home", "done"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn halting_after_ok_hook_skips_task_after_hook() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new().on("docs_ok.sh", Script::exit(1)));
    let task = TaskBuilder::new("docs")
        .after_ok(hook(&h.script("docs_ok.sh"), true))
        .after(hook(&h.script("docs_after.sh"), false))
        .build();
    let job = JobBuilder::new("home").task(task).build();

    let report = h.run(job).await;

    assert_eq!(report.failed_tasks, 1);
    assert_eq!(h.hooks_run(), vec!["docs_ok.sh"]);
    Ok(())
}

#[tokio::test]
async fn missing_hook_script_is_a_failure() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let missing = h.dir.path().join("does-not-exist.sh");
    let task = TaskBuilder::new("docs")
        .before(hook(&missing, false))
        .build();
    let job = JobBuilder::new("home").task(task).build();

    let report = h.run(job).await;

    // Non-halting: the sync still runs, but the task counts as failed.
    assert_eq!(h.syncs_run(), 1);
    assert_eq!(report.failed_tasks, 1);
    assert_eq!(report.terminal, TerminalState::Done);
    let expected = format!("file not found: {}", missing.display());
    assert!(h.output.lines(LineMode::Error).contains(&expected));
    Ok(())
}

#[tokio::test]
async fn disabled_and_blank_hooks_are_skipped_silently() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let mut disabled = hook(&h.script("disabled.sh"), true);
    disabled.enabled = false;
    let blank = rsyncjob::job::ExecuteItem::new("   ", true);

    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").before(blank).build())
        .before(disabled)
        .build();

    let report = h.run(job).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert!(h.hooks_run().is_empty());
    Ok(())
}

#[tokio::test]
async fn run_level_dry_run_marks_every_history_event() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").option("--archive").build())
        .build();

    let report = h.run_with(job, RunOptions { dry_run: true }).await;

    assert_eq!(report.terminal, TerminalState::Done);
    assert!(h.history().iter().all(|e| e.dry_run));

    let invocation = &h.launcher.invocations()[0];
    assert_eq!(invocation.program, RSYNC);
    assert_eq!(
        invocation.args,
        vec!["--dry-run", "--archive", "/src/docs/", "/dst/docs/"]
    );
    assert!(h.output.lines(LineMode::Warning).iter().any(|l| l.starts_with("dry run:")));
    Ok(())
}

#[tokio::test]
async fn task_level_dry_run_marks_only_task_events() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").dry_run(true).build())
        .build();

    h.run(job).await;

    let flags: Vec<_> = h
        .history()
        .into_iter()
        .map(|e| (e.entity_id, e.dry_run))
        .collect();
    assert_eq!(
        flags,
        vec![
            ("home".to_string(), false),
            ("docs".to_string(), true),
            ("docs".to_string(), true),
            ("home".to_string(), false),
        ]
    );
    assert_eq!(h.launcher.invocations()[0].args[0], "--dry-run");
    Ok(())
}

#[tokio::test]
async fn sync_output_is_routed_by_kind() -> TestResult {
    let launcher = ScriptedLauncher::new().on(
        "/src/docs/",
        Script::exit(0)
            .stdout("sending incremental file list")
            .stdout("report.pdf")
            .stdout("  102,400  50%  1.2MB/s  0:00:01")
            .stdout("  204,800 100%  1.3MB/s  0:00:00 (xfr#1, to-chk=0/2)")
            .stdout("")
            .stdout("deleting old.pdf")
            .stderr("rsync: some warning"),
    );
    let h = Harness::new(launcher);
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").build())
        .build();

    h.run(job).await;

    let info = h.output.lines(LineMode::Info);
    assert!(info.contains(&"report.pdf".to_string()));
    assert!(info.contains(&String::new()));
    assert!(!info.iter().any(|l| l.contains("50%")));

    let errors = h.output.lines(LineMode::Error);
    assert!(errors.contains(&"deleting old.pdf".to_string()));
    assert!(errors.contains(&"rsync: some warning".to_string()));

    let progress = h.progress.events();
    assert!(progress.contains(&ProgressEvent::Determinate {
        percent: 50,
        status: "report.pdf 50% 1.2MB/s 0:00:01".to_string(),
    }));
    let last_determinate = progress
        .iter()
        .rposition(|e| matches!(e, ProgressEvent::Determinate { percent: 100, .. }))
        .expect("100% reported");
    assert_eq!(progress[last_determinate + 1], ProgressEvent::Indeterminate);
    assert_eq!(progress.last(), Some(&ProgressEvent::Finish));
    Ok(())
}

#[tokio::test]
async fn command_line_and_folds_frame_the_task() -> TestResult {
    let h = Harness::new(ScriptedLauncher::new());
    let job = JobBuilder::new("home")
        .name("Home")
        .task(TaskBuilder::new("docs").name("Documents").exclude("*.tmp").build())
        .build();

    h.run(job).await;

    assert!(h.output.contains_line("/usr/bin/rsync --exclude=*.tmp /src/docs/ /dst/docs/"));
    assert!(h.output.contains_line(" - Documents"));

    let folds: Vec<_> = h
        .output
        .events()
        .into_iter()
        .filter(|e| matches!(e, OutputEvent::FoldStart(_) | OutputEvent::FoldEnd(_)))
        .collect();
    assert_eq!(
        folds,
        vec![
            OutputEvent::FoldStart(1),
            OutputEvent::FoldStart(2),
            OutputEvent::FoldEnd(2),
            OutputEvent::FoldEnd(1),
        ]
    );

    let last_header = h
        .output
        .events()
        .into_iter()
        .rev()
        .find_map(|e| match e {
            OutputEvent::Header { mode, action, kind, subject } => {
                Some((mode, action, kind, subject))
            }
            _ => None,
        })
        .expect("summary header");
    assert_eq!(last_header.0, LineMode::Ok);
    assert_eq!(last_header.1, "done");
    assert_eq!(last_header.2, "job");
    assert!(last_header.3.starts_with("Home ("));
    Ok(())
}

#[tokio::test]
async fn terminal_state_is_saved_to_status_store() -> TestResult {
    let launcher = ScriptedLauncher::new().on("/src/docs/", Script::exit(12));
    let h = Harness::new(launcher);
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").halt_job_on_error(true).build())
        .build();

    let report = h.run(job).await;

    let status = h.status.load("home").expect("status saved");
    assert_eq!(status.exit_code, 1);
    assert_eq!(status.last_run, report.started_at);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_fails_the_task_with_one_error_line() -> TestResult {
    let launcher = ScriptedLauncher::new().on(
        "/src/docs/",
        Script::spawn_failure("failed to start '/usr/bin/rsync': No such file or directory"),
    );
    let h = Harness::new(launcher);
    let job = JobBuilder::new("home")
        .task(TaskBuilder::new("docs").build())
        .build();

    let report = h.run(job).await;

    assert_eq!(report.failed_tasks, 1);
    let errors = h.output.lines(LineMode::Error);
    assert_eq!(
        errors.iter().filter(|l| l.starts_with("failed to start")).count(),
        1
    );
    // The sentinel exit code is not in the rsync table.
    assert!(h.output.events().iter().any(|e| matches!(
        e,
        OutputEvent::Header { kind, subject, .. } if kind == "rsync" && subject == "system code -1"
    )));
    Ok(())
}

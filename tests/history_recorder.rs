use std::error::Error;
use std::fs;

use chrono::{Local, TimeZone};

use rsyncjob::history::{HistoryEntry, HistoryRecorder, HistoryStatus, history_line};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn line_format_matches_log_layout() {
    let ts = Local.with_ymd_and_hms(2026, 10, 17, 2, 0, 5).unwrap();
    assert_eq!(
        history_line("nightly", HistoryStatus::Started, ts, false),
        "nightly started 2026-10-17 02:00:05\n"
    );
    assert_eq!(
        history_line("docs", HistoryStatus::Canceled, ts, true),
        "docs canceled 2026-10-17 02:00:05 (dry run)\n"
    );
}

#[test]
fn record_appends_and_creates_parent_dirs() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("history");
    let recorder = HistoryRecorder::new(&path);

    recorder.record("home", HistoryStatus::Started, Local::now(), false);
    recorder.record("docs", HistoryStatus::Started, Local::now(), true);
    recorder.record("docs", HistoryStatus::Done, Local::now(), true);
    recorder.record("home", HistoryStatus::Failed, Local::now(), false);

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), 4);

    let home = recorder.entries_for("home")?;
    let statuses: Vec<_> = home.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![HistoryStatus::Started, HistoryStatus::Failed]);
    assert!(recorder.entries_for("docs")?.iter().all(|e| e.dry_run));
    Ok(())
}

#[test]
fn missing_file_has_no_entries() -> TestResult {
    let dir = tempfile::tempdir()?;
    let recorder = HistoryRecorder::new(dir.path().join("history"));
    assert!(recorder.entries()?.is_empty());
    Ok(())
}

#[test]
fn unwritable_location_is_swallowed() -> TestResult {
    let dir = tempfile::tempdir()?;
    // A directory where the file should be: the append fails.
    let path = dir.path().join("history");
    fs::create_dir(&path)?;

    HistoryRecorder::new(&path).record("home", HistoryStatus::Started, Local::now(), false);
    assert!(path.is_dir());
    Ok(())
}

#[test]
fn malformed_lines_are_skipped() {
    assert!(HistoryEntry::parse("").is_none());
    assert!(HistoryEntry::parse("home exploded 2026-10-17 02:00:00").is_none());

    let entry = HistoryEntry::parse("home done 2026-10-17 02:00:00 (dry run)").unwrap();
    assert_eq!(entry.entity_id, "home");
    assert_eq!(entry.status, HistoryStatus::Done);
    assert_eq!(entry.timestamp, "2026-10-17 02:00:00");
    assert!(entry.dry_run);
}

#[test]
fn concurrent_writers_never_split_lines() -> TestResult {
    let dir = tempfile::tempdir()?;
    let recorder = HistoryRecorder::new(dir.path().join("history"));

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let recorder = recorder.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    recorder.record(&format!("job-{i}"), HistoryStatus::Started, Local::now(), false);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("writer thread");
    }

    let entries = recorder.entries()?;
    assert_eq!(entries.len(), 400);
    Ok(())
}

// tests/copy_log.rs

use std::sync::Arc;

use locality_scheduler::hierarchy::RealFile;
use locality_scheduler::location::{Location, LocationVersion};
use locality_scheduler::scheduler::{
    CopyLogLine, TaskInputFileLocationWrapper, parse_copy_log, reconcile_copy_log,
};

#[test]
fn log_lines_are_parsed_in_order() {
    let lines = parse_copy_log("S-/work/ab/cd/a\r\nF-/work/ab/cd/a\nrsync: noise\nS-\nX-/work/b\nS-/work/ab/cd/with space\n");
    assert_eq!(
        lines,
        vec![
            CopyLogLine::Started("/work/ab/cd/a".to_string()),
            CopyLogLine::Finished("/work/ab/cd/a".to_string()),
            CopyLogLine::Started("/work/ab/cd/with space".to_string()),
        ]
    );
}

#[test]
fn empty_log_has_no_lines() {
    assert!(parse_copy_log("").is_empty());
}

/// A file on `log-src` being copied to `log-dst`.
fn copied(path: &str) -> (TaskInputFileLocationWrapper, Arc<RealFile>) {
    let source = LocationVersion::new(Location::node("log-src"), 1, 10, None);
    let file = Arc::new(RealFile::new(Arc::clone(&source)));
    let wrapper = TaskInputFileLocationWrapper::new(
        path.to_string(),
        Arc::clone(&file),
        source.copy_to(Location::node("log-dst")),
    );
    (wrapper, file)
}

#[test]
fn finished_files_are_registered_and_open_ones_dropped() {
    let (done, done_file) = copied("/work/ab/cd/done");
    let (open, open_file) = copied("/work/ab/cd/open");
    let (untouched, untouched_file) = copied("/work/ab/cd/untouched");
    let files = vec![done, open, untouched];

    let outcome = reconcile_copy_log(
        "exec-1",
        "S-/work/ab/cd/done\nS-/work/ab/cd/open\nF-/work/ab/cd/done\n",
        &files,
    );

    assert_eq!(outcome.succeeded, vec!["/work/ab/cd/done".to_string()]);
    assert_eq!(outcome.failed, vec!["/work/ab/cd/open".to_string()]);
    let dst = Location::node("log-dst");
    let registered = done_file.location_version(&dst).unwrap();
    assert_eq!(
        registered.copy_of().map(|v| v.location().clone()),
        Some(Location::node("log-src"))
    );
    assert!(open_file.location_version(&dst).is_none());
    assert!(untouched_file.location_version(&dst).is_none());
    assert!(untouched_file.location_version(&Location::node("log-src")).is_some());
}

#[test]
fn open_file_with_a_stale_target_version_is_deactivated() {
    let (open, file) = copied("/work/ab/cd/stale");
    let stale = LocationVersion::new(Location::node("log-dst"), 0, 3, None);
    file.add_or_update_location(false, Arc::clone(&stale));

    let outcome = reconcile_copy_log("exec-2", "S-/work/ab/cd/stale\n", &[open]);

    assert_eq!(outcome.failed.len(), 1);
    assert!(!stale.is_active());
}

#[test]
fn paths_the_copy_did_not_own_are_ignored() {
    let (known, _) = copied("/work/ab/cd/known");

    let outcome = reconcile_copy_log(
        "exec-3",
        "S-/work/ab/cd/stranger\nF-/work/ab/cd/stranger\nS-/work/ab/cd/other\n",
        &[known],
    );

    assert!(outcome.succeeded.is_empty());
    assert!(outcome.failed.is_empty());
}

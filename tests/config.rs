// tests/config.rs

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use locality_scheduler::config::load_and_validate;
use locality_scheduler::scheduler_from_config;
use locality_scheduler::errors::SchedulerError;
use locality_scheduler::scheduler::LocalityScheduler;
use locality_scheduler::types::{AlignmentStrategy, LogLevel, SchedulingStrategy};
use locality_scheduler_test_utils::builders::chain_dag;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn minimal_config_gets_defaults() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.scheduler.workdir, PathBuf::from("/data/work"));
    assert_eq!(cfg.scheduler.sync_dir(), PathBuf::from("/localwork/sync"));
    assert_eq!(cfg.scheduler.strategy, SchedulingStrategy::Cost);
    assert!(!cfg.scheduler.trace_enabled);
    assert_eq!(cfg.copy.max_copy_tasks_per_node, 1);
    assert_eq!(cfg.copy.max_waiting_copy_tasks_per_node, 1);
    assert_eq!(cfg.copy.max_held_copy_task_ready, 3);
    assert_eq!(cfg.copy.prio_phase_three, 70);
    assert_eq!(cfg.copy.copy_same_task_in_parallel, 2);
    assert_eq!(cfg.alignment.strategy, AlignmentStrategy::Greedy);
    assert_eq!(cfg.alignment.weight_for_individual_node, 0.0);
    assert_eq!(cfg.alignment.stalemate_threshold, 0.05);
    assert_eq!(cfg.alignment.comparable_cost_epsilon, 1e-8);
    assert_eq!(cfg.alignment.seed, None);
}

#[test]
fn every_section_can_be_set() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"
local_workdir = "/scratch"
strategy = "ready"
trace_enabled = true
log_level = "debug"

[copy]
max_copy_tasks_per_node = 3
max_waiting_copy_tasks_per_node = 2
max_held_copy_task_ready = 4
prio_phase_three = 40
copy_same_task_in_parallel = 1

[alignment]
strategy = "random"
init_cost = 12.5
weight_for_individual_node = 0.25
seed = 99
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.scheduler.sync_dir(), PathBuf::from("/scratch/sync"));
    assert_eq!(cfg.scheduler.strategy, SchedulingStrategy::Ready);
    assert!(cfg.scheduler.trace_enabled);
    assert_eq!(cfg.scheduler.log_level, Some(LogLevel::Debug));
    assert_eq!(cfg.copy.max_copy_tasks_per_node, 3);
    assert_eq!(cfg.copy.prio_phase_three, 40);
    assert_eq!(cfg.alignment.strategy, AlignmentStrategy::Random);
    assert_eq!(cfg.alignment.init_cost, 12.5);
    assert_eq!(cfg.alignment.seed, Some(99));

    let scheduler = LocalityScheduler::new(cfg, std::sync::Arc::new(chain_dag(&["a"])));
    assert!(scheduler.is_ok());
}

#[test]
fn relative_workdir_is_rejected() {
    let file = write_config(
        r#"
[scheduler]
workdir = "data/work"
"#,
    );

    match load_and_validate(file.path()) {
        Err(SchedulerError::ConfigError(msg)) => assert!(msg.contains("absolute")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn zero_copy_cap_is_rejected() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"

[copy]
max_held_copy_task_ready = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(SchedulerError::ConfigError(msg)) => {
            assert!(msg.contains("max_held_copy_task_ready"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn priority_outside_range_is_rejected() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"

[copy]
prio_phase_three = 0
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(SchedulerError::ConfigError(msg)) if msg.contains("prio_phase_three")
    ));
}

#[test]
fn weight_outside_unit_interval_is_rejected() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"

[alignment]
weight_for_individual_node = 1.5
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(SchedulerError::InvalidWeight(w)) if w == 1.5
    ));
}

#[test]
fn unknown_strategy_is_a_parse_error() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"
strategy = "fastest"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(SchedulerError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(SchedulerError::IoError(_))));
}

#[test]
fn scheduler_is_built_straight_from_a_file() {
    let file = write_config(
        r#"
[scheduler]
workdir = "/data/work"
strategy = "ready"

[alignment]
seed = 7
"#,
    );

    let scheduler = scheduler_from_config(file.path(), std::sync::Arc::new(chain_dag(&["a"]))).unwrap();
    assert_eq!(scheduler.config().scheduler.workdir, PathBuf::from("/data/work"));
    assert_eq!(scheduler.config().scheduler.strategy, SchedulingStrategy::Ready);

    let dir = tempfile::tempdir().unwrap();
    assert!(scheduler_from_config(dir.path().join("absent.toml"), std::sync::Arc::new(chain_dag(&["a"]))).is_err());
}

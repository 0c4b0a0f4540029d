// tests/orchestrator.rs

use std::path::PathBuf;
use std::sync::Arc;

use locality_scheduler::config::ConfigFile;
use locality_scheduler::hierarchy::HierarchyNode;
use locality_scheduler::location::Location;
use locality_scheduler::scheduler::{LocalityScheduler, START_PRIORITY};
use locality_scheduler_test_utils::builders::{
    ClusterBuilder, TaskBuilder, add_input_file, chain_dag, scheduler_with, test_config, work_path,
};
use locality_scheduler_test_utils::init_tracing;

fn on_node(s: &LocalityScheduler, rel: &str, node: &str) -> bool {
    s.hierarchy()
        .get_file(&work_path(rel))
        .as_ref()
        .and_then(HierarchyNode::as_file)
        .and_then(|f| f.location_version(&Location::node(node)))
        .is_some()
}

#[test]
fn free_node_receives_data_of_a_task_blocked_elsewhere() {
    init_tracing();
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(test_config(), dag.clone());
    let source = add_input_file(s.hierarchy(), "ab/cd/pa/f", "orc-a-1", 1000, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-a-1", 4.0, 8192)
        .running("busy", 4.0, 8192)
        .node("orc-a-2", 4.0, 8192)
        .node("orc-a-3", 4.0, 8192)
        .not_ready()
        .build();
    let task = TaskBuilder::new("t", "a").input("ab/cd/pa/f").build(&dag);

    let copies = s.post_scheduling(&[Arc::clone(&task)], &cluster);

    assert_eq!(copies.len(), 1);
    let copy = &copies[0];
    assert_eq!(copy.node(), &Location::node("orc-a-2"));
    assert_eq!(copy.inputs().priority, START_PRIORITY);
    assert_eq!(copy.bytes(), 1000);
    assert_eq!(copy.inputs().entries[0].node, Location::node("orc-a-1"));
    assert_eq!(
        copy.inputs().log_path(),
        PathBuf::from("/localwork/sync").join(format!("{}-copy-0", task.execution()))
    );
    assert_eq!(source.in_use_count(), 1);
    assert_eq!(s.currently_copying().number_of_nodes_for_task(&task), 1);
    assert_eq!(task.node(), None, "a copy does not place the task");

    assert!(s.copy_task_finished(copy, true).is_none());
    assert!(on_node(&s, "ab/cd/pa/f", "orc-a-2"));
    assert_eq!(source.in_use_count(), 0);
    assert!(s.currently_copying().reservations().is_empty());
}

#[test]
fn capacity_phase_picks_the_node_missing_least() {
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(test_config(), dag.clone());
    add_input_file(s.hierarchy(), "ab/cd/pb/small", "orc-b-1", 100, 1);
    add_input_file(s.hierarchy(), "ab/cd/pb/big", "orc-b-2", 900, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-b-1", 4.0, 8192)
        .node("orc-b-2", 4.0, 8192)
        .node("orc-b-3", 4.0, 8192)
        .build();
    let task = TaskBuilder::new("t", "a").input("ab/cd/pb").build(&dag);

    let copies = s.post_scheduling(&[task], &cluster);

    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].node(), &Location::node("orc-b-2"));
    assert_eq!(copies[0].bytes(), 100);
}

#[test]
fn full_cluster_falls_back_to_prefetching() {
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(test_config(), dag.clone());
    add_input_file(s.hierarchy(), "ab/cd/pc/f", "orc-c-1", 1000, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-c-1", 4.0, 8192)
        .running("busy-1", 4.0, 8192)
        .node("orc-c-2", 4.0, 8192)
        .running("busy-2", 4.0, 8192)
        .build();
    let task = TaskBuilder::new("t", "a").input("ab/cd/pc/f").build(&dag);

    let copies = s.post_scheduling(&[task], &cluster);

    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].node(), &Location::node("orc-c-2"));
    assert_eq!(copies[0].inputs().priority, 70);
}

/// Two tasks, each with its own input on the full `orc-d-1`, prefetched
/// towards the full `orc-d-2`.
fn prefetch_count(configure: impl FnOnce(&mut ConfigFile), prefix: &str) -> usize {
    let mut cfg = test_config();
    configure(&mut cfg);
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(cfg, dag.clone());
    let src = format!("{prefix}-1");
    let dst = format!("{prefix}-2");
    add_input_file(s.hierarchy(), "ab/cd/pd/one", &src, 10, 1);
    add_input_file(s.hierarchy(), "ab/cd/pd/two", &src, 10, 1);
    let cluster = ClusterBuilder::new()
        .node(&src, 4.0, 8192)
        .running("busy-1", 4.0, 8192)
        .node(&dst, 4.0, 8192)
        .running("busy-2", 4.0, 8192)
        .build();
    let tasks = vec![
        TaskBuilder::new("one", "a").input("ab/cd/pd/one").build(&dag),
        TaskBuilder::new("two", "a").input("ab/cd/pd/two").build(&dag),
    ];
    s.post_scheduling(&tasks, &cluster).len()
}

#[test]
fn prefetching_respects_every_cap() {
    assert_eq!(prefetch_count(|_| {}, "orc-d"), 1, "one copy task per node by default");
    assert_eq!(
        prefetch_count(|c| c.copy.max_copy_tasks_per_node = 5, "orc-e"),
        1,
        "one prefetch per node and pass"
    );
    assert_eq!(
        prefetch_count(
            |c| {
                c.copy.max_copy_tasks_per_node = 5;
                c.copy.max_waiting_copy_tasks_per_node = 5;
            },
            "orc-f"
        ),
        2
    );
    assert_eq!(
        prefetch_count(
            |c| {
                c.copy.max_copy_tasks_per_node = 5;
                c.copy.max_waiting_copy_tasks_per_node = 5;
                c.copy.max_held_copy_task_ready = 1;
            },
            "orc-g"
        ),
        1,
        "the node may only hold one prefetched task"
    );
}

#[test]
fn a_task_is_copied_to_a_bounded_number_of_nodes() {
    let run = |parallel: usize, prefix: &str| {
        let mut cfg = test_config();
        cfg.copy.copy_same_task_in_parallel = parallel;
        let dag = chain_dag(&["a"]);
        let (s, _fs) = scheduler_with(cfg, dag.clone());
        let src = format!("{prefix}-1");
        add_input_file(s.hierarchy(), "ab/cd/pe/f", &src, 10, 1);
        let cluster = ClusterBuilder::new()
            .node(&src, 4.0, 8192)
            .running("busy", 4.0, 8192)
            .node(&format!("{prefix}-2"), 4.0, 8192)
            .node(&format!("{prefix}-3"), 4.0, 8192)
            .build();
        let task = TaskBuilder::new("t", "a").input("ab/cd/pe/f").build(&dag);

        let first = s.post_scheduling(&[Arc::clone(&task)], &cluster);
        let second = s.post_scheduling(&[Arc::clone(&task)], &cluster);
        (first.len(), second.len(), s.currently_copying().number_of_nodes_for_task(&task))
    };

    assert_eq!(run(1, "orc-h"), (1, 0, 1));
    assert_eq!(run(2, "orc-i"), (1, 1, 2));
}

#[test]
fn files_already_in_flight_are_not_copied_twice() {
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(test_config(), dag.clone());
    add_input_file(s.hierarchy(), "ab/cd/pf/shared", "orc-j-1", 100, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-j-1", 4.0, 8192)
        .running("busy", 4.0, 8192)
        .node("orc-j-2", 4.0, 8192)
        .build();
    let first = TaskBuilder::new("first", "a").input("ab/cd/pf/shared").build(&dag);
    let second = TaskBuilder::new("second", "a").input("ab/cd/pf/shared").build(&dag);

    let copies = s.post_scheduling(&[first], &cluster);
    assert_eq!(copies.len(), 1);

    // The path is already on its way, so the second task only waits.
    let more = s.post_scheduling(&[second], &cluster);
    assert!(more.is_empty());
}

#[test]
fn failed_copy_is_reconciled_from_its_log() {
    let dag = chain_dag(&["a"]);
    let (s, fs) = scheduler_with(test_config(), dag.clone());
    let a = add_input_file(s.hierarchy(), "ab/cd/pg/a", "orc-k-1", 100, 1);
    add_input_file(s.hierarchy(), "ab/cd/pg/b", "orc-k-1", 100, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-k-1", 4.0, 8192)
        .running("busy", 4.0, 8192)
        .node("orc-k-2", 4.0, 8192)
        .build();
    let task = TaskBuilder::new("t", "a").input("ab/cd/pg").build(&dag);

    let copies = s.post_scheduling(&[task], &cluster);
    let copy = &copies[0];
    let pa = work_path("ab/cd/pg/a").to_string_lossy().into_owned();
    let pb = work_path("ab/cd/pg/b").to_string_lossy().into_owned();
    fs.add_file(copy.inputs().log_path(), format!("S-{pa}\nF-{pa}\nS-{pb}\nnoise\n"));

    let outcome = s.copy_task_finished(copy, false).expect("log exists");

    assert_eq!(outcome.succeeded, vec![pa]);
    assert_eq!(outcome.failed, vec![pb]);
    assert!(on_node(&s, "ab/cd/pg/a", "orc-k-2"));
    assert!(!on_node(&s, "ab/cd/pg/b", "orc-k-2"));
    assert_eq!(a.in_use_count(), 0);
    assert!(s.currently_copying().reservations().is_empty());
}

#[test]
fn undone_copy_releases_its_reservation() {
    let dag = chain_dag(&["a"]);
    let (s, _fs) = scheduler_with(test_config(), dag.clone());
    let v = add_input_file(s.hierarchy(), "ab/cd/ph/f", "orc-l-1", 100, 1);
    let cluster = ClusterBuilder::new()
        .node("orc-l-1", 4.0, 8192)
        .running("busy", 4.0, 8192)
        .node("orc-l-2", 4.0, 8192)
        .build();
    let task = TaskBuilder::new("t", "a").input("ab/cd/ph/f").build(&dag);

    let copies = s.post_scheduling(&[Arc::clone(&task)], &cluster);
    s.undo_copy_task(&copies[0]);

    assert_eq!(v.in_use_count(), 0);
    assert!(s.currently_copying().reservations().is_empty());
    assert!(!on_node(&s, "ab/cd/ph/f", "orc-l-2"));
    assert_eq!(s.post_scheduling(&[task], &cluster).len(), 1, "the copy can be planned again");
}

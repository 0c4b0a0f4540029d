// tests/alignment.rs

use std::sync::Arc;

use proptest::prelude::*;

use locality_scheduler::alignment::{
    GreedyAlignment, InputAlignment, MinSizeCost, RandomAlignment,
};
use locality_scheduler::copying::{CurrentlyCopying, CurrentlyCopyingOnNode};
use locality_scheduler::errors::SchedulerError;
use locality_scheduler::hierarchy::HierarchyWrapper;
use locality_scheduler::inputs::{InputFileCollector, TaskInputs};
use locality_scheduler::location::Location;
use locality_scheduler::workflow::Task;
use locality_scheduler_test_utils::builders::{
    TaskBuilder, WORKDIR, add_input_file, chain_dag, work_path,
};
use locality_scheduler_test_utils::init_tracing;

/// `big` (100 bytes) on al-node-1 and al-node-2, `small` (50 bytes) on
/// al-node-2 only.
fn inputs() -> (TaskInputs, Arc<Task>) {
    let h = Arc::new(HierarchyWrapper::new(WORKDIR));
    add_input_file(&h, "ab/cd/big", "al-node-1", 100, 1);
    add_input_file(&h, "ab/cd/big", "al-node-2", 100, 1);
    add_input_file(&h, "ab/cd/small", "al-node-2", 50, 1);
    let dag = chain_dag(&["a"]);
    let task = TaskBuilder::new("t", "a").input("ab/cd/big").input("ab/cd/small").build(&dag);
    let inputs = InputFileCollector::new(h)
        .inputs_of_task(&task, &dag, 4)
        .unwrap()
        .unwrap();
    (inputs, task)
}

fn greedy(weight: f64) -> GreedyAlignment {
    GreedyAlignment::new(weight, Box::new(MinSizeCost::new(0.0))).unwrap()
}

#[test]
fn local_files_cost_nothing() {
    init_tracing();
    let (inputs, _) = inputs();
    let node = Location::node("al-node-1");
    let alignment = greedy(0.5)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();

    assert_eq!(alignment.cost(), 50.0);
    assert!(alignment.copy_from_somewhere(&node));
    assert_eq!(alignment.bytes_to_copy(&node), 50);
    let local = &alignment.node_file_alignment()[&node];
    assert_eq!(local.files_to_copy().len(), 1);
    assert_eq!(alignment.all_location_versions().len(), 2);
}

#[test]
fn node_with_everything_needs_no_copy() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-2");
    let alignment = greedy(0.5)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();

    assert_eq!(alignment.cost(), 0.0);
    assert!(!alignment.copy_from_somewhere(&node));
}

#[test]
fn weight_mixes_busiest_source_and_total() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");

    let balanced = greedy(0.5)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();
    // big from al-node-1 (first of two equal options), small from al-node-2.
    assert_eq!(balanced.cost(), 0.5 * 100.0 + 0.5 * 150.0);

    let busiest_only = greedy(1.0)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();
    assert_eq!(busiest_only.cost(), 100.0);
}

#[test]
fn alignment_with_a_taken_path_reserves_nothing() {
    let (inputs, task) = inputs();
    let node = Location::node("al-node-3");
    let alignment = greedy(0.5)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();
    let small = work_path("ab/cd/small").to_string_lossy().into_owned();
    let big = work_path("ab/cd/big").to_string_lossy().into_owned();

    let planned = CurrentlyCopying::new();
    let other = TaskBuilder::new("other", "a").build(&chain_dag(&["a"]));
    planned
        .get(&node)
        .add(&small, &other, &Location::node("al-node-2"))
        .unwrap();

    let err = planned.add_alignment(&alignment, &task, &node).unwrap_err();
    assert!(matches!(err, SchedulerError::CopyReservationConflict { .. }));
    let on_node = planned.get(&node);
    assert!(!on_node.is_currently_copying(&big));
    assert_eq!(on_node.copy_source(&small).unwrap().task.name(), "other");

    let fresh = CurrentlyCopying::new();
    fresh.add_alignment(&alignment, &task, &node).unwrap();
    assert_eq!(fresh.get(&node).len(), 2);
}

#[test]
fn planning_stops_once_the_ceiling_is_passed() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let strategy = greedy(0.5);

    assert!(strategy.input_alignment(&inputs, &node, None, None, 110.0).unwrap().is_none());
    assert!(strategy.input_alignment(&inputs, &node, None, None, 125.0).unwrap().is_some());
}

#[test]
fn costs_never_decrease_as_files_are_added() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let strategy = greedy(0.3);
    let full = strategy
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap()
        .cost();

    let mut ceiling = 0.0;
    while ceiling < full {
        assert!(
            strategy.input_alignment(&inputs, &node, None, None, ceiling).unwrap().is_none(),
            "ceiling {ceiling} below final cost {full} must prune"
        );
        ceiling += 10.0;
    }
}

#[test]
fn files_in_flight_are_awaited() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let other = TaskBuilder::new("other", "a").build(&chain_dag(&["a"]));
    let copying = CurrentlyCopyingOnNode::new(node.clone());
    copying
        .add(&work_path("ab/cd/small").to_string_lossy(), &other, &Location::node("al-node-2"))
        .unwrap();

    let alignment = greedy(0.5)
        .input_alignment(&inputs, &node, Some(&copying), None, f64::MAX)
        .unwrap()
        .unwrap();

    assert_eq!(alignment.cost(), 100.0);
    assert_eq!(alignment.bytes_to_wait_for(), 50);
    let from_two = &alignment.node_file_alignment()[&Location::node("al-node-2")];
    assert_eq!(from_two.wait_for().len(), 1);
    assert!(from_two.files_to_copy().is_empty());
}

#[test]
fn incompatible_copy_in_flight_rules_out_the_node() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let other = TaskBuilder::new("other", "a").build(&chain_dag(&["a"]));
    let copying = CurrentlyCopyingOnNode::new(node.clone());
    copying
        .add(&work_path("ab/cd/small").to_string_lossy(), &other, &Location::node("al-node-9"))
        .unwrap();

    let err = greedy(0.5)
        .input_alignment(&inputs, &node, Some(&copying), None, f64::MAX)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NoAlignmentPossible(_)));
}

#[test]
fn weight_outside_unit_interval_is_rejected() {
    for bad in [-0.1, 1.5] {
        let err = GreedyAlignment::new(bad, Box::new(MinSizeCost::new(0.0))).err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidWeight(w) if w == bad));
    }
}

#[test]
fn init_cost_charges_each_new_source() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let strategy = GreedyAlignment::new(0.0, Box::new(MinSizeCost::new(1000.0))).unwrap();
    let alignment = strategy
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();
    // With a large init cost both files come from al-node-2.
    let sources: Vec<_> = alignment
        .node_file_alignment()
        .iter()
        .filter(|(_, w)| !w.files_to_copy().is_empty())
        .map(|(l, _)| l.clone())
        .collect();
    assert_eq!(sources.len(), 2, "sum-only cost does not consolidate sources");
    assert_eq!(alignment.cost(), 150.0);
}

#[test]
fn random_alignment_prefers_local_and_counts_bytes() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-2");
    let alignment = RandomAlignment::with_seed(42)
        .input_alignment(&inputs, &node, None, None, f64::MAX)
        .unwrap()
        .unwrap();

    assert_eq!(alignment.cost(), 150.0);
    assert!(!alignment.copy_from_somewhere(&node));
}

#[test]
fn random_alignment_is_reproducible_with_a_seed() {
    let (inputs, _) = inputs();
    let node = Location::node("al-node-3");
    let pick = |seed| {
        let alignment = RandomAlignment::with_seed(seed)
            .input_alignment(&inputs, &node, None, None, f64::MAX)
            .unwrap()
            .unwrap();
        alignment
            .node_file_alignment()
            .iter()
            .map(|(l, w)| (l.clone(), w.files_to_copy().len()))
            .collect::<Vec<_>>()
    };
    assert_eq!(pick(9), pick(9));
}

/// `(size, source node index)` per input file.
fn file_specs() -> impl Strategy<Value = Vec<(u64, usize)>> {
    proptest::collection::vec((1..1000u64, 0..3usize), 1..8)
}

proptest! {
    #[test]
    fn a_ceiling_prunes_exactly_the_plans_above_it(
        specs in file_specs(),
        weight in 0.0..=1.0f64,
        ceiling_share in 0.0..2.0f64,
    ) {
        let h = Arc::new(HierarchyWrapper::new(WORKDIR));
        let dag = chain_dag(&["a"]);
        let mut builder = TaskBuilder::new("t", "a");
        for (i, (size, source)) in specs.iter().enumerate() {
            let rel = format!("ab/cd/prop/f{i}");
            add_input_file(&h, &rel, &format!("al-prop-{source}"), *size, 1);
            builder = builder.input(&rel);
        }
        let task = builder.build(&dag);
        let inputs = InputFileCollector::new(h)
            .inputs_of_task(&task, &dag, 4)
            .unwrap()
            .unwrap();
        let node = Location::node("al-prop-target");
        let strategy = greedy(weight);

        let full = strategy
            .input_alignment(&inputs, &node, None, None, f64::MAX)
            .unwrap()
            .unwrap()
            .cost();
        let ceiling = full * ceiling_share;
        let pruned = strategy.input_alignment(&inputs, &node, None, None, ceiling).unwrap();

        match pruned {
            Some(plan) => {
                prop_assert!(full <= ceiling);
                prop_assert_eq!(plan.cost(), full);
            }
            None => prop_assert!(full > ceiling),
        }
    }
}

// tests/ordering.rs

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use locality_scheduler::cluster::{NodeWithAlloc, Requirements};
use locality_scheduler::inputs::{TaskInputs, TaskNodeStats};
use locality_scheduler::location::Location;
use locality_scheduler::scheduler::{
    NodeDataTuple, NodeStatOrder, SortedList, TaskData, TaskStat, TaskStatOrder, stalemate,
};
use locality_scheduler_test_utils::builders::{TaskBuilder, chain_dag};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn empty_inputs() -> TaskInputs {
    TaskInputs::new(Vec::new(), Vec::new(), HashSet::new())
}

fn stats(remaining: u64, copying: u64, on_node: u64) -> TaskNodeStats {
    TaskNodeStats {
        size_remaining: remaining,
        size_currently_copying: copying,
        size_on_node: on_node,
    }
}

#[test]
fn sorted_list_keeps_insertion_order_among_equals() {
    let mut list = SortedList::new(vec![(3, 'a'), (1, 'b'), (3, 'c')], |a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
    list.add((1, 'd'));
    list.add((2, 'e'));

    let order: Vec<char> = std::iter::from_fn(|| list.poll()).map(|(_, c)| c).collect();
    assert_eq!(order, vec!['b', 'd', 'e', 'a', 'c']);
}

#[test]
fn sorted_list_remove_where() {
    let mut list = SortedList::new(vec![5, 1, 4, 2, 3], |a: &i32, b: &i32| a.cmp(b));
    let removed = list.remove_where(|x| x % 2 == 0);
    assert_eq!(removed, vec![2, 4]);
    let rest: Vec<i32> = std::iter::from_fn(|| list.poll()).collect();
    assert_eq!(rest, vec![1, 3, 5]);
}

#[test]
fn node_order_min_size_prefers_least_missing() {
    let dag = chain_dag(&["a"]);
    let task = TaskBuilder::new("t", "a").build(&dag);
    let mut stat = TaskStat::new(task, empty_inputs());
    stat.add(Location::node("ord-node-1"), stats(300, 0, 0));
    stat.add(Location::node("ord-node-2"), stats(100, 50, 0));
    stat.add(Location::node("ord-node-3"), stats(100, 10, 0));
    stat.set_order(TaskStatOrder::CapacityAvailable);

    let nodes: Vec<_> = stat.node_stats().iter().map(|n| n.node.clone()).collect();
    assert_eq!(
        nodes,
        vec![Location::node("ord-node-3"), Location::node("ord-node-2"), Location::node("ord-node-1")]
    );
    assert!(stat.increase_index_to_compare());
    assert_eq!(stat.best_stats().unwrap().node, Location::node("ord-node-2"));
    assert!(stat.increase_index_to_compare());
    assert!(!stat.increase_index_to_compare());
    assert!(stat.best_stats().is_none());
}

#[test]
fn complete_and_copying_nodes_are_counted_not_listed() {
    let dag = chain_dag(&["a"]);
    let task = TaskBuilder::new("t", "a").build(&dag);
    let mut stat = TaskStat::new(task, empty_inputs());
    stat.add(Location::node("ord-node-1"), stats(0, 0, 10));
    stat.add(Location::node("ord-node-2"), stats(0, 5, 5));

    assert_eq!(stat.complete_on_nodes(), 1);
    assert_eq!(stat.copying_to_nodes(), 1);
    assert_eq!(stat.data_on_nodes(), 2);
    assert!(!stat.missing_data_on_any_node());
}

#[test]
fn copy_in_advance_ranks_later_steps_first() {
    let dag = chain_dag(&["early", "late"]);
    let early = TaskBuilder::new("e", "early").build(&dag);
    let late = TaskBuilder::new("l", "late").build(&dag);

    let mut a = TaskStat::new(early, empty_inputs());
    a.add(Location::node("ord-node-1"), stats(10, 0, 0));
    let mut b = TaskStat::new(late, empty_inputs());
    b.add(Location::node("ord-node-1"), stats(1000, 0, 0));

    for s in [&mut a, &mut b] {
        s.set_order(TaskStatOrder::CopyInAdvance);
    }
    assert_eq!(TaskStat::compare(&b, &a), Ordering::Less);

    for s in [&mut a, &mut b] {
        s.set_order(TaskStatOrder::CapacityAvailable);
    }
    assert_eq!(TaskStat::compare(&a, &b), Ordering::Less);
}

#[test]
fn tasks_complete_on_fewer_nodes_come_first() {
    let dag = chain_dag(&["a"]);
    let mut lonely = TaskStat::new(TaskBuilder::new("x", "a").build(&dag), empty_inputs());
    lonely.add(Location::node("ord-node-1"), stats(500, 0, 0));
    let mut covered = TaskStat::new(TaskBuilder::new("y", "a").build(&dag), empty_inputs());
    covered.add(Location::node("ord-node-2"), stats(0, 0, 1));
    covered.add(Location::node("ord-node-1"), stats(1, 0, 0));

    lonely.set_order(TaskStatOrder::CapacityAvailable);
    covered.set_order(TaskStatOrder::CapacityAvailable);
    assert_eq!(TaskStat::compare(&lonely, &covered), Ordering::Less);
}

#[test]
fn max_size_puts_bigger_tasks_first() {
    let order = NodeStatOrder::MaxSize;
    let dag = chain_dag(&["a"]);
    let mut small = TaskStat::new(TaskBuilder::new("s", "a").build(&dag), empty_inputs());
    small.add(Location::node("ord-node-1"), stats(10, 0, 0));
    let mut big = TaskStat::new(TaskBuilder::new("b", "a").build(&dag), empty_inputs());
    big.add(Location::node("ord-node-1"), stats(90, 0, 10));

    let s = small.best_stats().unwrap();
    let b = big.best_stats().unwrap();
    assert_eq!(order.compare(b, s), Ordering::Less);
}

#[test]
fn task_data_value_follows_size() {
    let dag = chain_dag(&["a"]);
    let task = TaskBuilder::new("t", "a").build(&dag);
    let node = Location::node("ord-node-1");
    let with_node = TaskData::new(
        task.clone(),
        empty_inputs(),
        vec![NodeDataTuple { node: node.clone(), size_in_bytes: 0 }],
        None,
    );
    assert_eq!(with_node.value(), f64::MAX, "no input data schedules first");

    let mut data = TaskData::new(
        task,
        empty_inputs(),
        vec![NodeDataTuple { node: node.clone(), size_in_bytes: 0 }],
        None,
    );
    let mut available = HashMap::new();
    available.insert(node, Requirements::new(0.5, 10));
    assert!(data.calculate(&available));
    assert!(data.node_data().is_empty());
    assert_eq!(data.value(), f64::MIN_POSITIVE);
}

#[test]
fn task_data_tracks_out_label_weight() {
    let dag = chain_dag(&["a"]);
    let labelled = TaskBuilder::new("t", "a").out_label("sample-1", 0.5).build(&dag);
    let mut data = TaskData::new(labelled, empty_inputs(), Vec::new(), None);
    assert!(!data.weight_was_set());

    data.set_node_and_weight(Location::node("ord-node-1"), 0.5);
    assert!(data.weight_was_set());
    assert_eq!(data.out_label_node(), Some(&Location::node("ord-node-1")));
    assert_eq!(data.weight(), 0.5);
}

fn node(name: &str, cpu: f64, ram: i64) -> NodeWithAlloc {
    NodeWithAlloc::new(Location::node(name), Requirements::new(cpu, ram))
}

#[test]
fn stalemate_prefers_more_free_cpu() {
    let old = node("sm-node-1", 8.0, 1000);
    let new = node("sm-node-2", 8.0, 1000);
    let mut available = HashMap::new();
    available.insert(old.location.clone(), Requirements::new(2.0, 1000));
    available.insert(new.location.clone(), Requirements::new(6.0, 1000));
    let request = Requirements::new(1.0, 100);
    let mut rng = StdRng::seed_from_u64(1);

    assert!(stalemate(&old, &new, &available, &HashMap::new(), &request, 0.05, &mut rng));
    assert!(!stalemate(&new, &old, &available, &HashMap::new(), &request, 0.05, &mut rng));
}

#[test]
fn stalemate_then_compares_pods() {
    let old = node("sm-node-3", 8.0, 1000);
    let new = node("sm-node-4", 8.0, 1000);
    let mut available = HashMap::new();
    available.insert(old.location.clone(), Requirements::new(4.0, 1000));
    available.insert(new.location.clone(), Requirements::new(4.1, 1000));
    let mut assigned = HashMap::new();
    assigned.insert(old.location.clone(), 2);
    let request = Requirements::new(1.0, 100);
    let mut rng = StdRng::seed_from_u64(1);

    assert!(stalemate(&old, &new, &available, &assigned, &request, 0.05, &mut rng));
}

#[test]
fn stalemate_then_compares_memory() {
    let old = node("sm-node-5", 8.0, 1000);
    let new = node("sm-node-6", 8.0, 1000);
    let mut available = HashMap::new();
    available.insert(old.location.clone(), Requirements::new(4.0, 900));
    available.insert(new.location.clone(), Requirements::new(4.0, 300));
    let request = Requirements::new(1.0, 100);
    let mut rng = StdRng::seed_from_u64(1);

    assert!(!stalemate(&old, &new, &available, &HashMap::new(), &request, 0.05, &mut rng));
}

#[test]
fn stalemate_ties_are_random_but_seeded() {
    let old = node("sm-node-7", 8.0, 1000);
    let new = node("sm-node-8", 8.0, 1000);
    let mut available = HashMap::new();
    available.insert(old.location.clone(), Requirements::new(4.0, 500));
    available.insert(new.location.clone(), Requirements::new(4.0, 500));
    let request = Requirements::new(1.0, 100);

    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..32)
            .map(|_| stalemate(&old, &new, &available, &HashMap::new(), &request, 0.05, &mut rng))
            .collect::<Vec<_>>()
    };
    let first = run(3);
    assert_eq!(first, run(3));
    assert!(first.iter().any(|w| *w) && first.iter().any(|w| !*w));
}

#[test]
fn zero_capacity_node_counts_as_full() {
    let old = node("sm-node-9", 0.0, 0);
    let new = node("sm-node-10", 4.0, 100);
    let mut available = HashMap::new();
    available.insert(new.location.clone(), Requirements::new(4.0, 100));
    let request = Requirements::new(1.0, 10);
    let mut rng = StdRng::seed_from_u64(1);

    assert!(stalemate(&old, &new, &available, &HashMap::new(), &request, 0.05, &mut rng));
}

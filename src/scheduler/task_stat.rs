// src/scheduler/task_stat.rs

//! Per-task view of how much input each node already has.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::inputs::{TaskInputs, TaskNodeStats};
use crate::location::Location;
use crate::workflow::Task;

use super::comparators::TaskStatOrder;

/// Input statistics of one task on one node that still misses data.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAndStat {
    pub node: Location,
    pub stats: TaskNodeStats,
    pub(crate) task_id: u64,
}

/// Candidate nodes of one task, ordered best first under the current
/// [`TaskStatOrder`].
///
/// Nodes that already hold (or are already receiving) every input are only
/// counted; copying to them would gain nothing.
#[derive(Debug)]
pub struct TaskStat {
    task: Arc<Task>,
    inputs: TaskInputs,
    order: TaskStatOrder,
    node_stats: Vec<NodeAndStat>,
    complete_on_nodes: usize,
    copying_to_nodes: usize,
    index_to_compare: usize,
    copy_to_node_with_available_resources: bool,
    can_start_after_copying: usize,
}

impl TaskStat {
    pub fn new(task: Arc<Task>, inputs: TaskInputs) -> Self {
        Self {
            task,
            inputs,
            order: TaskStatOrder::default(),
            node_stats: Vec::new(),
            complete_on_nodes: 0,
            copying_to_nodes: 0,
            index_to_compare: 0,
            copy_to_node_with_available_resources: false,
            can_start_after_copying: 0,
        }
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn inputs(&self) -> &TaskInputs {
        &self.inputs
    }

    pub fn add(&mut self, node: Location, stats: TaskNodeStats) {
        if stats.all_on_node() {
            self.complete_on_nodes += 1;
        } else if stats.all_on_node_or_copying() {
            self.copying_to_nodes += 1;
        } else {
            self.node_stats.push(NodeAndStat {
                node,
                stats,
                task_id: self.task.id(),
            });
        }
    }

    /// Some node misses data that a copy could bring.
    pub fn missing_data_on_any_node(&self) -> bool {
        !self.node_stats.is_empty()
    }

    pub fn can_start_somewhere(&self) -> bool {
        self.missing_data_on_any_node()
    }

    pub fn complete_on_nodes(&self) -> usize {
        self.complete_on_nodes
    }

    pub fn copying_to_nodes(&self) -> usize {
        self.copying_to_nodes
    }

    /// Nodes that hold all data or are receiving the rest.
    pub fn data_on_nodes(&self) -> usize {
        self.complete_on_nodes + self.copying_to_nodes
    }

    pub fn node_stats(&self) -> &[NodeAndStat] {
        &self.node_stats
    }

    /// Re-sort the candidate nodes and restart from the best one.
    pub fn set_order(&mut self, order: TaskStatOrder) {
        self.order = order;
        self.index_to_compare = 0;
        let node_order = order.node_order();
        self.node_stats.sort_by(|a, b| node_order.compare(a, b));
    }

    /// Move on to the next best node; false once none is left.
    pub fn increase_index_to_compare(&mut self) -> bool {
        self.index_to_compare += 1;
        self.index_to_compare < self.node_stats.len()
    }

    pub fn best_stats(&self) -> Option<&NodeAndStat> {
        self.node_stats.get(self.index_to_compare)
    }

    pub fn mark_copy_to_node_with_available_resources(&mut self) {
        self.copy_to_node_with_available_resources = true;
    }

    pub fn is_copy_to_node_with_available_resources(&self) -> bool {
        self.copy_to_node_with_available_resources
    }

    /// A running copy brings this task to a node that can host it.
    pub fn can_start_after_copying(&mut self) {
        self.can_start_after_copying += 1;
    }

    pub fn compare(a: &TaskStat, b: &TaskStat) -> Ordering {
        a.order.compare(a, b)
    }
}

/// All task statistics of one post-scheduling round.
#[derive(Debug, Default)]
pub struct TaskStats {
    stats: Vec<TaskStat>,
}

impl TaskStats {
    pub fn new(stats: Vec<TaskStat>) -> Self {
        Self { stats }
    }

    pub fn add(&mut self, stat: TaskStat) {
        self.stats.push(stat);
    }

    pub fn get_mut(&mut self, task_id: u64) -> Option<&mut TaskStat> {
        self.stats.iter_mut().find(|s| s.task.id() == task_id)
    }

    pub fn set_order(&mut self, order: TaskStatOrder) {
        for stat in &mut self.stats {
            stat.set_order(order);
        }
    }

    /// Move the matching statistics out; hand them back with
    /// [`restore`](Self::restore).
    pub fn take_where(&mut self, pred: impl Fn(&TaskStat) -> bool) -> Vec<TaskStat> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.stats)
            .into_iter()
            .partition(|s| pred(s));
        self.stats = kept;
        taken
    }

    pub fn restore(&mut self, stats: impl IntoIterator<Item = TaskStat>) {
        self.stats.extend(stats);
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskStat> {
        self.stats.iter()
    }
}

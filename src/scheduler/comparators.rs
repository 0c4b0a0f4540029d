// src/scheduler/comparators.rs

//! Orderings used by the two copy phases.
//!
//! A [`NodeStatOrder`] ranks the candidate nodes of one task. A
//! [`TaskStatOrder`] ranks tasks against each other, falling back to the
//! node ordering of their current best candidates. Smaller sorts first.

use std::cmp::Ordering;

use super::task_stat::{NodeAndStat, TaskStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStatOrder {
    /// Least data missing first, then least data still in flight.
    #[default]
    MinSize,
    /// Largest task first. Candidates of the same task, or of tasks with the
    /// same size, are ranked by least data missing.
    MaxSize,
}

impl NodeStatOrder {
    pub fn compare(self, a: &NodeAndStat, b: &NodeAndStat) -> Ordering {
        match self {
            NodeStatOrder::MinSize => a
                .stats
                .size_remaining
                .cmp(&b.stats.size_remaining)
                .then_with(|| {
                    a.stats
                        .size_currently_copying
                        .cmp(&b.stats.size_currently_copying)
                }),
            NodeStatOrder::MaxSize => {
                if a.task_id == b.task_id || a.stats.task_size() == b.stats.task_size() {
                    a.stats.size_remaining.cmp(&b.stats.size_remaining)
                } else {
                    b.stats.task_size().cmp(&a.stats.task_size())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatOrder {
    /// Fill free capacity: tasks complete on fewer nodes first, then tasks
    /// being copied to fewer nodes, then [`NodeStatOrder::MinSize`].
    #[default]
    CapacityAvailable,
    /// Prefetch: higher workflow rank first, then as above with
    /// [`NodeStatOrder::MaxSize`].
    CopyInAdvance,
}

impl TaskStatOrder {
    pub fn node_order(self) -> NodeStatOrder {
        match self {
            TaskStatOrder::CapacityAvailable => NodeStatOrder::MinSize,
            TaskStatOrder::CopyInAdvance => NodeStatOrder::MaxSize,
        }
    }

    pub fn compare(self, a: &TaskStat, b: &TaskStat) -> Ordering {
        let inner = self.node_order();
        match self {
            TaskStatOrder::CapacityAvailable => min_copying(inner, a, b),
            TaskStatOrder::CopyInAdvance => b
                .task()
                .step()
                .rank()
                .cmp(&a.task().step().rank())
                .then_with(|| min_copying(inner, a, b)),
        }
    }
}

fn min_copying(inner: NodeStatOrder, a: &TaskStat, b: &TaskStat) -> Ordering {
    a.complete_on_nodes()
        .cmp(&b.complete_on_nodes())
        .then_with(|| a.copying_to_nodes().cmp(&b.copying_to_nodes()))
        .then_with(|| match (a.best_stats(), b.best_stats()) {
            (Some(x), Some(y)) => inner.compare(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

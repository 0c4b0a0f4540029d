// src/scheduler/orchestrator.rs

//! Decides which background copies to start after a scheduling pass.
//!
//! Runs in two phases over the same [`TaskStats`]:
//!
//! 1. **Capacity available.** Copy inputs of tasks to nodes that could host
//!    them right now, so they become runnable where they fit.
//! 2. **Copy in advance.** Use the remaining copy slots to move data of the
//!    remaining tasks towards the node that already holds most of it.
//!
//! Everything planned here is recorded in a pass-local `planned`
//! [`CurrentlyCopying`] so that later plans wait for earlier ones instead of
//! copying the same path twice.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::alignment::{FileAlignment, InputAlignment};
use crate::cluster::Requirements;
use crate::copying::CurrentlyCopying;
use crate::location::Location;

use super::NodeTaskFilesAlignment;
use super::comparators::TaskStatOrder;
use super::sorted_list::SortedList;
use super::task_stat::{TaskStat, TaskStats};

/// Limits that apply to both phases.
#[derive(Debug, Clone, Copy)]
pub struct CopyLimits {
    pub max_copy_tasks_per_node: usize,
    /// Prefetch copies one pass may add per node.
    pub max_waiting_copy_tasks_per_node: usize,
    pub max_held_copy_task_ready: usize,
    pub copy_same_task_in_parallel: usize,
}

pub(crate) struct CopyPlanner<'a> {
    pub currently_copying: &'a CurrentlyCopying,
    pub alignment: &'a dyn InputAlignment,
    pub limits: CopyLimits,
}

/// Per-pass bookkeeping shared between the phases.
#[derive(Debug, Default)]
pub(crate) struct PlannerState {
    pub planned: CurrentlyCopying,
    /// Copy tasks running or planned per node.
    pub copying_tasks_on_node: HashMap<Location, usize>,
    /// Tasks that could start on the node once running copies finish.
    pub ready_tasks_per_node: HashMap<Location, usize>,
    pub prefetched_on_node: HashMap<Location, usize>,
    pub alignments: Vec<NodeTaskFilesAlignment>,
}

impl PlannerState {
    fn copying_on(&self, node: &Location) -> usize {
        self.copying_tasks_on_node.get(node).copied().unwrap_or(0)
    }
}

impl CopyPlanner<'_> {
    fn file_alignment(&self, stat: &TaskStat, node: &Location, state: &PlannerState) -> Option<FileAlignment> {
        let copying = self.currently_copying.get(node);
        let planned = state.planned.get(node);
        match self
            .alignment
            .input_alignment(stat.inputs(), node, Some(&copying), Some(&planned), f64::MAX)
        {
            Ok(alignment) => alignment,
            Err(e) => {
                debug!(task = %stat.task().name(), node = %node, error = %e, "no copy plan");
                None
            }
        }
    }

    /// Plan copying the missing inputs of `stat` to `node`.
    fn create_file_alignment(
        &self,
        state: &mut PlannerState,
        stat: &mut TaskStat,
        node: &Location,
        priority: u8,
    ) -> bool {
        let Some(alignment) = self.file_alignment(stat, node, state) else {
            return false;
        };
        if !alignment.copy_from_somewhere(node) {
            return false;
        }
        let task = Arc::clone(stat.task());
        if let Err(e) = state.planned.add_alignment(&alignment, &task, node) {
            warn!(task = %task.name(), node = %node, error = %e, "copy plan collides with an earlier one");
            return false;
        }
        trace!(task = %task.name(), node = %node, priority, "planned copy");
        state.alignments.push(NodeTaskFilesAlignment::new(
            node.clone(),
            task,
            alignment,
            priority,
        ));
        *state.copying_tasks_on_node.entry(node.clone()).or_default() += 1;
        stat.mark_copy_to_node_with_available_resources();
        true
    }

    fn remove_tasks_copied_too_often(&self, list: &mut SortedList<TaskStat>) -> Vec<TaskStat> {
        let limit = self.limits.copy_same_task_in_parallel;
        list.remove_where(|s| self.currently_copying.number_of_nodes_for_task(s.task()) >= limit)
    }

    /// Resources of tasks already copying to a node are treated as taken.
    fn remove_available_resources(
        &self,
        stats: &mut TaskStats,
        available: &mut HashMap<Location, Requirements>,
    ) {
        for (node, free) in available.iter_mut() {
            let mut budget = *free;
            for task in self.currently_copying.tasks_on_node(node) {
                let request = task.request();
                if !budget.higher_or_equals(&request) {
                    continue;
                }
                budget -= request;
                if free.higher_or_equals(&request) {
                    *free -= request;
                    if let Some(stat) = stats.get_mut(task.id()) {
                        stat.can_start_after_copying();
                    }
                }
            }
        }
    }

    /// Phase one: copy to nodes with room for the task.
    pub fn capacity_available_to_node(
        &self,
        state: &mut PlannerState,
        stats: &mut TaskStats,
        available: &mut HashMap<Location, Requirements>,
        priority: u8,
    ) {
        stats.set_order(TaskStatOrder::CapacityAvailable);
        self.remove_available_resources(stats, available);

        let mut list = SortedList::new(
            stats.take_where(TaskStat::missing_data_on_any_node),
            TaskStat::compare,
        );
        let mut done = self.remove_tasks_copied_too_often(&mut list);

        while let Some(mut stat) = list.poll() {
            let Some(node) = stat.best_stats().map(|b| b.node.clone()) else {
                done.push(stat);
                continue;
            };
            let request = stat.task().request();
            let fits = state.copying_on(&node) < self.limits.max_copy_tasks_per_node
                && available
                    .get(&node)
                    .is_some_and(|free| free.higher_or_equals(&request));

            let added = fits && self.create_file_alignment(state, &mut stat, &node, priority);
            if added {
                if let Some(free) = available.get_mut(&node) {
                    *free -= request;
                }
                done.push(stat);
            } else if stat.increase_index_to_compare() {
                list.add(stat);
            } else {
                done.push(stat);
            }
        }
        stats.restore(done);
    }

    /// Phase two: prefetch for tasks phase one could not place.
    pub fn copy_in_advance(&self, state: &mut PlannerState, stats: &mut TaskStats, priority: u8) {
        stats.set_order(TaskStatOrder::CopyInAdvance);

        let mut list = SortedList::new(stats.take_where(|_| true), TaskStat::compare);
        let mut done = self.remove_tasks_copied_too_often(&mut list);

        while let Some(mut stat) = list.poll() {
            if !stat.missing_data_on_any_node() || stat.is_copy_to_node_with_available_resources() {
                done.push(stat);
                continue;
            }
            let Some(node) = stat.best_stats().map(|b| b.node.clone()) else {
                done.push(stat);
                continue;
            };
            let held = state.ready_tasks_per_node.get(&node).copied().unwrap_or(0);
            let prefetched = state.prefetched_on_node.get(&node).copied().unwrap_or(0);
            let fits = state.copying_on(&node) < self.limits.max_copy_tasks_per_node
                && prefetched < self.limits.max_waiting_copy_tasks_per_node
                && held < self.limits.max_held_copy_task_ready;

            let added = fits && self.create_file_alignment(state, &mut stat, &node, priority);
            if added {
                *state.prefetched_on_node.entry(node.clone()).or_default() += 1;
                *state.ready_tasks_per_node.entry(node).or_default() += 1;
                done.push(stat);
            } else if stat.increase_index_to_compare() {
                list.add(stat);
            } else {
                done.push(stat);
            }
        }
        stats.restore(done);
    }
}

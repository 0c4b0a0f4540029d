// src/scheduler/trace.rs

//! Per-task scheduling telemetry.
//!
//! Only filled when `[scheduler].trace_enabled` is set. Nothing in the
//! scheduler reads these values back.

use crate::alignment::FileAlignment;
use crate::location::Location;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceRecord {
    /// Candidate nodes an alignment was attempted on.
    pub nodes_tried: usize,
    /// Cost per tried node; `None` where the node was pruned or rejected.
    pub node_costs: Vec<(Location, Option<f64>)>,
    /// Nodes abandoned because their cost passed the best so far.
    pub could_stop_fetching: usize,
    /// Nodes that could not host the task at all.
    pub no_alignment_found: usize,
    pub best_cost: Option<f64>,
    /// Position in the pass's queue when the task was aligned.
    pub place_in_queue: Option<usize>,
    /// Admissible versions over all inputs.
    pub location_count: usize,
    pub copy_tasks: usize,
    pub files_on_node: usize,
    pub files_on_node_bytes: u64,
    pub files_other_task: usize,
    pub files_other_task_bytes: u64,
    pub files_to_copy: usize,
    pub files_to_copy_bytes: u64,
    pub nodes_to_copy_from: usize,
}

impl TraceRecord {
    pub fn copy_task(&mut self) {
        self.copy_tasks += 1;
    }

    /// Split the chosen plan into local, awaited and copied files.
    pub fn record_alignment(&mut self, node: &Location, alignment: &FileAlignment) {
        self.files_on_node = 0;
        self.files_on_node_bytes = 0;
        self.files_other_task = 0;
        self.files_other_task_bytes = 0;
        self.files_to_copy = 0;
        self.files_to_copy_bytes = 0;
        self.nodes_to_copy_from = 0;
        for (location, wrapper) in alignment.node_file_alignment() {
            if location == node {
                self.files_on_node += wrapper.files_to_copy().len() + wrapper.wait_for().len();
                self.files_on_node_bytes += wrapper.to_copy_size() + wrapper.to_wait_size();
                continue;
            }
            self.files_other_task += wrapper.wait_for().len();
            self.files_other_task_bytes += wrapper.to_wait_size();
            self.files_to_copy += wrapper.files_to_copy().len();
            self.files_to_copy_bytes += wrapper.to_copy_size();
            if !wrapper.files_to_copy().is_empty() {
                self.nodes_to_copy_from += 1;
            }
        }
    }
}

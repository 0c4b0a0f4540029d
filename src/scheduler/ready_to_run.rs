// src/scheduler/ready_to_run.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cluster::Requirements;
use crate::inputs::{SymlinkInput, TaskInputs};
use crate::location::{Location, LocationVersion};
use crate::workflow::Task;

/// A task together with the nodes that already hold every input.
#[derive(Debug)]
pub struct TaskInputsNodes {
    pub task: Arc<Task>,
    pub nodes_with_all_data: Vec<Location>,
    pub inputs: TaskInputs,
}

impl TaskInputsNodes {
    pub fn task_size(&self) -> u64 {
        self.inputs.calculate_avg_size()
    }
}

/// Placement of a task on a node that needs no copying.
#[derive(Debug, Clone)]
pub struct NodeTaskLocalFilesAlignment {
    pub node: Location,
    pub task: Arc<Task>,
    pub symlinks: Vec<SymlinkInput>,
    /// The node's version of every input.
    pub location_versions: Vec<Arc<LocationVersion>>,
}

/// First fit: each task goes to the first of its nodes with room for it.
///
/// Placed tasks are removed from `tasks` and their request is taken from
/// `available`.
pub fn ready_to_run_to_node(
    tasks: &mut Vec<TaskInputsNodes>,
    available: &mut HashMap<Location, Requirements>,
) -> Vec<NodeTaskLocalFilesAlignment> {
    let mut placed = Vec::new();
    let mut remaining = Vec::with_capacity(tasks.len());

    for entry in tasks.drain(..) {
        let request = entry.task.request();
        let node = entry.nodes_with_all_data.iter().find(|node| {
            available
                .get(*node)
                .is_some_and(|free| free.higher_or_equals(&request))
        });
        match node.cloned() {
            Some(node) => {
                if let Some(free) = available.get_mut(&node) {
                    *free -= request;
                }
                debug!(task = %entry.task.name(), node = %node, "all inputs local");
                placed.push(NodeTaskLocalFilesAlignment {
                    location_versions: entry.inputs.all_location_versions_on_location(&node),
                    symlinks: entry.inputs.symlinks.clone(),
                    task: entry.task,
                    node,
                });
            }
            None => remaining.push(entry),
        }
    }

    *tasks = remaining;
    info!(placed = placed.len(), left = tasks.len(), "ready-to-run placement");
    placed
}

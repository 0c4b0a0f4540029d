// src/scheduler/out_label.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::location::Location;
use crate::workflow::Task;

#[derive(Debug, Default)]
struct LabelNodes {
    tasks_by_node: HashMap<Location, HashSet<u64>>,
    best_value: usize,
    best_nodes: BTreeSet<Location>,
}

impl LabelNodes {
    fn add_task(&mut self, task_id: u64, node: &Location) {
        let tasks = self.tasks_by_node.entry(node.clone()).or_default();
        tasks.insert(task_id);
        let value = tasks.len();
        if value > self.best_value {
            self.best_value = value;
            self.best_nodes.clear();
        }
        if value >= self.best_value {
            self.best_nodes.insert(node.clone());
        }
    }
}

/// Remembers where tasks of each out-label went, so that later tasks with
/// the same label can follow them.
///
/// The preferred node is the one that received the most tasks of the
/// label; ties go to the smallest node name. Assignments that are undone
/// later are not forgotten.
#[derive(Debug, Default)]
pub struct OutLabelHolder {
    labels: HashMap<String, LabelNodes>,
}

impl OutLabelHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until a task with `label` was scheduled.
    pub fn node_for_label(&self, label: &str) -> Option<Location> {
        self.labels
            .get(label)
            .and_then(|nodes| nodes.best_nodes.first().cloned())
    }

    /// Tasks without a label are ignored.
    pub fn schedule_task_on_node(&mut self, task: &Task, node: &Location) {
        let Some(label) = task.out_label() else {
            return;
        };
        let nodes = self.labels.entry(label.label.clone()).or_default();
        nodes.add_task(task.id(), node);
        debug!(label = %label.label, node = %node, best = ?nodes.best_nodes, "out-label placement");
    }
}

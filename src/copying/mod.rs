// src/copying/mod.rs

//! Copy reservations: which paths are on their way to which node, and for
//! which task.
//!
//! A [`CurrentlyCopyingOnNode`] is both the per-node reservation table and
//! the set of paths one task plans to copy to one node. [`CurrentlyCopying`]
//! indexes the per-node tables and remembers which tasks copy where.
//!
//! Mutation of the shared tables happens under the scheduler's copy lock;
//! the inner mutexes only keep individual reads consistent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tracing::debug;

use crate::alignment::FileAlignment;
use crate::errors::{Result, SchedulerError};
use crate::location::Location;
use crate::workflow::Task;

/// Where a reserved path is copied from, and on whose behalf.
#[derive(Debug, Clone)]
pub struct CopySource {
    pub task: Arc<Task>,
    pub location: Location,
}

/// Paths being copied to one node.
#[derive(Debug)]
pub struct CurrentlyCopyingOnNode {
    node: Location,
    files: Mutex<HashMap<String, CopySource>>,
}

impl CurrentlyCopyingOnNode {
    pub fn new(node: Location) -> Self {
        Self {
            node,
            files: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CopySource>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node(&self) -> &Location {
        &self.node
    }

    /// Reserve `path`. A path can only be reserved once per node.
    pub fn add(&self, path: &str, task: &Arc<Task>, source: &Location) -> Result<()> {
        let mut files = self.lock();
        if files.contains_key(path) {
            return Err(SchedulerError::CopyReservationConflict {
                path: path.to_string(),
                node: self.node.clone(),
            });
        }
        files.insert(
            path.to_string(),
            CopySource {
                task: Arc::clone(task),
                location: source.clone(),
            },
        );
        Ok(())
    }

    pub fn is_currently_copying(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    pub fn copy_source(&self, path: &str) -> Option<CopySource> {
        self.lock().get(path).cloned()
    }

    /// Reserve every path of `other`, or none of them if one is taken.
    pub fn add_all(&self, other: &CurrentlyCopyingOnNode) -> Result<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        let incoming = other.snapshot();
        let mut files = self.lock();
        if let Some(path) = incoming.keys().find(|p| files.contains_key(*p)) {
            return Err(SchedulerError::CopyReservationConflict {
                path: path.clone(),
                node: self.node.clone(),
            });
        }
        files.extend(incoming);
        Ok(())
    }

    /// Release every path of `other`.
    pub fn remove_all(&self, other: &CurrentlyCopyingOnNode) {
        if std::ptr::eq(self, other) {
            self.lock().clear();
            return;
        }
        let paths = other.all_files_currently_copying();
        self.lock().retain(|p, _| !paths.contains(p));
    }

    pub fn all_files_currently_copying(&self) -> HashSet<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> HashMap<String, CopySource> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Debug, Default)]
struct TaskNodeIndex {
    tasks_on_node: HashMap<Location, Vec<Arc<Task>>>,
    nodes_for_task: HashMap<u64, Vec<Location>>,
}

/// Everything currently being copied, across all nodes.
#[derive(Debug, Default)]
pub struct CurrentlyCopying {
    copying_to_node: DashMap<Location, Arc<CurrentlyCopyingOnNode>>,
    index: Mutex<TaskNodeIndex>,
}

impl CurrentlyCopying {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> MutexGuard<'_, TaskNodeIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `task` copies the paths of `plan` to `node`.
    pub fn add(&self, task: &Arc<Task>, node: &Location, plan: &CurrentlyCopyingOnNode) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        self.get(node).add_all(plan)?;
        let mut index = self.index();
        index
            .tasks_on_node
            .entry(node.clone())
            .or_default()
            .push(Arc::clone(task));
        index
            .nodes_for_task
            .entry(task.id())
            .or_default()
            .push(node.clone());
        debug!(task = %task.name(), node = %node, files = plan.len(), "reserved copies");
        Ok(())
    }

    /// Reservation table for `node`, created on first use.
    pub fn get(&self, node: &Location) -> Arc<CurrentlyCopyingOnNode> {
        Arc::clone(
            self.copying_to_node
                .entry(node.clone())
                .or_insert_with(|| Arc::new(CurrentlyCopyingOnNode::new(node.clone())))
                .value(),
        )
    }

    /// Undo an earlier [`add`](Self::add).
    pub fn remove(&self, task: &Arc<Task>, node: &Location, plan: &CurrentlyCopyingOnNode) {
        if plan.is_empty() {
            return;
        }
        if let Some(on_node) = self.copying_to_node.get(node).map(|e| Arc::clone(e.value())) {
            on_node.remove_all(plan);
        }
        self.copying_to_node.remove_if(node, |_, v| v.is_empty());

        let mut index = self.index();
        if let Some(tasks) = index.tasks_on_node.get_mut(node) {
            if let Some(pos) = tasks.iter().position(|t| t.id() == task.id()) {
                tasks.remove(pos);
            }
            if tasks.is_empty() {
                index.tasks_on_node.remove(node);
            }
        }
        if let Some(nodes) = index.nodes_for_task.get_mut(&task.id()) {
            if let Some(pos) = nodes.iter().position(|n| n == node) {
                nodes.remove(pos);
            }
            if nodes.is_empty() {
                index.nodes_for_task.remove(&task.id());
            }
        }
    }

    pub fn tasks_on_node(&self, node: &Location) -> Vec<Arc<Task>> {
        self.index()
            .tasks_on_node
            .get(node)
            .cloned()
            .unwrap_or_default()
    }

    pub fn number_of_nodes_for_task(&self, task: &Task) -> usize {
        self.index()
            .nodes_for_task
            .get(&task.id())
            .map_or(0, Vec::len)
    }

    /// Number of tasks copying to each node.
    pub fn currently_copying_tasks_on_node(&self) -> HashMap<Location, usize> {
        self.index()
            .tasks_on_node
            .iter()
            .map(|(node, tasks)| (node.clone(), tasks.len()))
            .collect()
    }

    /// Reserve the to-copy files of `alignment` for `task` on `node`, all or
    /// nothing.
    ///
    /// Used to track what a pass has planned before anything is committed.
    pub fn add_alignment(&self, alignment: &FileAlignment, task: &Arc<Task>, node: &Location) -> Result<()> {
        let plan = CurrentlyCopyingOnNode::new(node.clone());
        for (source, wrapper) in alignment.node_file_alignment() {
            if source == node {
                continue;
            }
            for file in wrapper.files_to_copy() {
                plan.add(&file.path_string(), task, source)?;
            }
        }
        if plan.is_empty() {
            return Ok(());
        }
        self.get(node).add_all(&plan)
    }

    /// Snapshot of every node's reservations, for inspection and tests.
    pub fn reservations(&self) -> HashMap<Location, HashSet<String>> {
        self.copying_to_node
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| (e.key().clone(), e.value().all_files_currently_copying()))
            .collect()
    }
}

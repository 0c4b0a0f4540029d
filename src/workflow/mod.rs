// src/workflow/mod.rs

//! Workflow steps, task instances and the lineage oracle.

pub mod lineage;

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use lineage::{LineageOracle, WorkflowDag, WorkflowDagBuilder};

use crate::cluster::Requirements;
use crate::copying::CurrentlyCopyingOnNode;
use crate::location::{Location, LocationVersion, registry};
use crate::scheduler::copy_task::TaskInputFileLocationWrapper;
use crate::scheduler::trace::TraceRecord;

/// A named stage in the workflow DAG. Tasks are instances of a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowStep {
    name: String,
    rank: u32,
}

impl WorkflowStep {
    pub fn new(name: &str, rank: u32) -> Self {
        Self {
            name: name.to_string(),
            rank,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the step in the workflow; later steps rank higher.
    pub fn rank(&self) -> u32 {
        self.rank
    }
}

/// Output-routing affinity: tasks sharing a label prefer the same node.
#[derive(Debug, Clone, PartialEq)]
pub struct OutLabel {
    pub label: String,
    pub weight: f64,
}

/// What a scheduling pass reserved for a task, so it can be undone.
#[derive(Debug, Default)]
pub struct TaskSchedulingState {
    /// Versions marked in use on behalf of the task.
    pub input_files: Vec<Arc<LocationVersion>>,
    /// Node the task was assigned to.
    pub node: Option<Location>,
    /// Paths reserved on the assigned node for the task's own start.
    pub copying_to_node: Option<Arc<CurrentlyCopyingOnNode>>,
    /// Per-file copies the task's start performs; reconciled when it finishes.
    pub copied_files: Vec<TaskInputFileLocationWrapper>,
    pub trace: TraceRecord,
}

/// One task instance of a workflow step.
///
/// Tasks are shared as `Arc<Task>` and compared by id.
pub struct Task {
    id: u64,
    name: String,
    step: Arc<WorkflowStep>,
    request: Requirements,
    inputs: Vec<PathBuf>,
    out_label: Option<OutLabel>,
    node_selector: HashMap<String, String>,
    execution: String,
    copy_task_counter: AtomicU64,
    state: Mutex<TaskSchedulingState>,
}

impl Task {
    pub fn new(name: &str, step: Arc<WorkflowStep>, request: Requirements) -> Self {
        Self {
            id: registry().next_task_id(),
            name: name.to_string(),
            step,
            request,
            inputs: Vec::new(),
            out_label: None,
            node_selector: HashMap::new(),
            execution: name.to_string(),
            copy_task_counter: AtomicU64::new(0),
            state: Mutex::new(TaskSchedulingState::default()),
        }
    }

    /// Declared input paths (files, directories or symlinks).
    pub fn with_inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_out_label(mut self, label: &str, weight: f64) -> Self {
        self.out_label = Some(OutLabel {
            label: label.to_string(),
            weight,
        });
        self
    }

    pub fn with_node_selector(mut self, key: &str, value: &str) -> Self {
        self.node_selector.insert(key.to_string(), value.to_string());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> &Arc<WorkflowStep> {
        &self.step
    }

    pub fn request(&self) -> Requirements {
        self.request
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn out_label(&self) -> Option<&OutLabel> {
        self.out_label.as_ref()
    }

    pub fn node_selector(&self) -> &HashMap<String, String> {
        &self.node_selector
    }

    pub fn execution(&self) -> &str {
        &self.execution
    }

    /// Next id for a copy task started on behalf of this task.
    pub fn next_copy_task_id(&self) -> u64 {
        self.copy_task_counter.fetch_add(1, Ordering::Relaxed)
    }

    pub fn state(&self) -> MutexGuard<'_, TaskSchedulingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node(&self) -> Option<Location> {
        self.state().node.clone()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("step", &self.step.name())
            .finish()
    }
}

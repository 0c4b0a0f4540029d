#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use locality_scheduler::cluster::{ClusterSnapshot, NodeWithAlloc, Requirements};
use locality_scheduler::config::ConfigFile;
use locality_scheduler::fs::mock::MockFileSystem;
use locality_scheduler::hierarchy::HierarchyWrapper;
use locality_scheduler::location::{Location, LocationVersion};
use locality_scheduler::scheduler::LocalityScheduler;
use locality_scheduler::workflow::{Task, WorkflowDag};

/// Shared working directory used by the builders.
pub const WORKDIR: &str = "/work";

/// `WORKDIR` joined with `rel`.
pub fn work_path(rel: &str) -> PathBuf {
    Path::new(WORKDIR).join(rel)
}

/// Builder for `ClusterSnapshot`.
#[derive(Debug, Default)]
pub struct ClusterBuilder {
    nodes: Vec<NodeWithAlloc>,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str, cpu: f64, ram: i64) -> Self {
        self.nodes
            .push(NodeWithAlloc::new(Location::node(name), Requirements::new(cpu, ram)));
        self
    }

    /// Label the node added last.
    pub fn label(mut self, key: &str, value: &str) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.labels.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Place a running pod on the node added last.
    pub fn running(mut self, pod: &str, cpu: f64, ram: i64) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.assigned
                .insert(pod.to_string(), Requirements::new(cpu, ram));
        }
        self
    }

    /// Mark the node added last as not ready.
    pub fn not_ready(mut self) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.ready = false;
        }
        self
    }

    pub fn build(self) -> ClusterSnapshot {
        ClusterSnapshot::new(self.nodes)
    }
}

/// A linear workflow `steps[0] -> steps[1] -> ...` ranked by position.
pub fn chain_dag(steps: &[&str]) -> WorkflowDag {
    let mut builder = WorkflowDag::builder();
    for (rank, step) in steps.iter().enumerate() {
        builder = builder.step(step, rank as u32);
    }
    for pair in steps.windows(2) {
        builder = builder.edge(pair[0], pair[1]);
    }
    builder.build().expect("chain workflow is acyclic")
}

/// Builder for `Task`.
pub struct TaskBuilder {
    name: String,
    step: String,
    cpu: f64,
    ram: i64,
    inputs: Vec<PathBuf>,
    out_label: Option<(String, f64)>,
    selector: Vec<(String, String)>,
}

impl TaskBuilder {
    pub fn new(name: &str, step: &str) -> Self {
        Self {
            name: name.to_string(),
            step: step.to_string(),
            cpu: 1.0,
            ram: 1024,
            inputs: Vec::new(),
            out_label: None,
            selector: Vec::new(),
        }
    }

    pub fn request(mut self, cpu: f64, ram: i64) -> Self {
        self.cpu = cpu;
        self.ram = ram;
        self
    }

    /// Add an input relative to `WORKDIR`.
    pub fn input(mut self, rel: &str) -> Self {
        self.inputs.push(work_path(rel));
        self
    }

    pub fn out_label(mut self, label: &str, weight: f64) -> Self {
        self.out_label = Some((label.to_string(), weight));
        self
    }

    pub fn selector(mut self, key: &str, value: &str) -> Self {
        self.selector.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self, dag: &WorkflowDag) -> Arc<Task> {
        let step = dag.step(&self.step).expect("step is part of the workflow");
        let mut task = Task::new(&self.name, step, Requirements::new(self.cpu, self.ram))
            .with_inputs(self.inputs);
        if let Some((label, weight)) = self.out_label {
            task = task.with_out_label(&label, weight);
        }
        for (k, v) in self.selector {
            task = task.with_node_selector(&k, &v);
        }
        Arc::new(task)
    }
}

/// Record `rel` on `node` as a workflow input.
pub fn add_input_file(
    hierarchy: &HierarchyWrapper,
    rel: &str,
    node: &str,
    size: u64,
    timestamp: i64,
) -> Arc<LocationVersion> {
    let version = LocationVersion::new(Location::node(node), timestamp, size, None);
    hierarchy
        .add_file(&work_path(rel), version)
        .expect("path lies inside the working directory")
}

/// Record `rel` on `node` as an output of `task`.
pub fn add_output_file(
    hierarchy: &HierarchyWrapper,
    rel: &str,
    node: &str,
    size: u64,
    timestamp: i64,
    task: &Arc<Task>,
) -> Arc<LocationVersion> {
    let version = LocationVersion::new(Location::node(node), timestamp, size, Some(Arc::clone(task)));
    hierarchy
        .add_file_overwrite(&work_path(rel), true, version)
        .expect("path lies inside the working directory")
}

/// Config rooted at `WORKDIR` with a fixed seed.
pub fn test_config() -> ConfigFile {
    let mut cfg = ConfigFile::with_workdir(WORKDIR);
    cfg.scheduler.local_workdir = PathBuf::from("/localwork");
    cfg.alignment.seed = Some(7);
    cfg
}

/// A scheduler over `dag` that reads copy logs from the returned mock.
pub fn scheduler_with(cfg: ConfigFile, dag: WorkflowDag) -> (LocalityScheduler, MockFileSystem) {
    let fs = MockFileSystem::new();
    let scheduler = LocalityScheduler::new(cfg, Arc::new(dag))
        .expect("test config is valid")
        .with_file_system(Arc::new(fs.clone()));
    (scheduler, fs)
}

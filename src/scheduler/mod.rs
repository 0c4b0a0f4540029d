// src/scheduler/mod.rs

//! The locality-aware scheduler.
//!
//! [`LocalityScheduler`] owns the file hierarchy and the table of running
//! copies. One call to [`schedule`](LocalityScheduler::schedule) places
//! tasks on nodes and then plans background copies for the tasks that are
//! left. The other entry points report progress back: a task's start
//! finished, a copy finished, a task finished or was removed.
//!
//! Every change to the copy table happens under one lock, so a copy cannot
//! finish between the moment a pass looks at the table and the moment it
//! commits to it.

pub mod comparators;
pub mod copy_task;
pub mod driver;
pub mod orchestrator;
pub mod out_label;
pub mod ready_to_run;
pub mod sorted_list;
pub mod task_stat;
pub mod trace;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use comparators::{NodeStatOrder, TaskStatOrder};
pub use copy_task::{
    CopyInputs, CopyLogLine, CopyLogOutcome, CopyPlan, CopyTask, InputEntry,
    TaskInputFileLocationWrapper, parse_copy_log, reconcile_copy_log,
};
pub use driver::{NodeDataTuple, TaskData, stalemate};
pub use orchestrator::CopyLimits;
pub use out_label::OutLabelHolder;
pub use ready_to_run::{NodeTaskLocalFilesAlignment, TaskInputsNodes, ready_to_run_to_node};
pub use sorted_list::SortedList;
pub use task_stat::{NodeAndStat, TaskStat, TaskStats};
pub use trace::TraceRecord;

use crate::alignment::{
    CostFunction, FileAlignment, GreedyAlignment, InputAlignment, MinSizeCost, RandomAlignment,
};
use crate::cluster::{ClusterSnapshot, Requirements};
use crate::config::{AlignmentSection, ConfigFile};
use crate::copying::CurrentlyCopying;
use crate::errors::{Result, SchedulerError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::hierarchy::{HierarchyNode, HierarchyWrapper};
use crate::inputs::{InputFileCollector, SymlinkInput};
use crate::location::{Location, LocationKind, LocationVersion};
use crate::types::{AlignmentStrategy, CostFunctionKind, SchedulingStrategy};
use crate::workflow::{LineageOracle, Task};

use orchestrator::{CopyPlanner, PlannerState};

/// Priority of copies a task needs to start.
pub const START_PRIORITY: u8 = 100;

/// A task, the node chosen for it and how its inputs get there.
#[derive(Debug, Clone)]
pub struct NodeTaskFilesAlignment {
    pub node: Location,
    pub task: Arc<Task>,
    pub alignment: FileAlignment,
    pub priority: u8,
}

impl NodeTaskFilesAlignment {
    pub fn new(node: Location, task: Arc<Task>, alignment: FileAlignment, priority: u8) -> Self {
        Self {
            node,
            task,
            alignment,
            priority,
        }
    }
}

/// A committed placement, ready to be started.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub task: Arc<Task>,
    pub node: Location,
    /// What the task's start must copy, wait for and link.
    pub inputs: CopyInputs,
}

/// Result of one scheduling pass.
#[derive(Debug, Default)]
pub struct SchedulingOutcome {
    pub assignments: Vec<Assignment>,
    /// Reserved background copies; hand them to a copy runner.
    pub copy_tasks: Vec<CopyTask>,
}

/// A file a finished task reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size: u64,
    pub timestamp: i64,
}

/// Where the newest version of a path lives, after following symlinks.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLocation {
    /// The path the symlinks lead to.
    pub path: PathBuf,
    pub symlinks: Vec<SymlinkInput>,
    /// `None` if the file is not known.
    pub node: Option<Location>,
}

/// Build the alignment strategy `cfg` asks for.
pub fn alignment_from_config(cfg: &AlignmentSection) -> Result<Box<dyn InputAlignment>> {
    let cost: Box<dyn CostFunction> = match cfg.cost_function {
        CostFunctionKind::MinSize => Box::new(MinSizeCost::new(cfg.init_cost)),
    };
    Ok(match cfg.strategy {
        AlignmentStrategy::Greedy => {
            Box::new(GreedyAlignment::new(cfg.weight_for_individual_node, cost)?)
        }
        AlignmentStrategy::Random => Box::new(match cfg.seed {
            Some(seed) => RandomAlignment::with_seed(seed),
            None => RandomAlignment::new(),
        }),
    })
}

pub struct LocalityScheduler {
    config: ConfigFile,
    hierarchy: Arc<HierarchyWrapper>,
    collector: InputFileCollector,
    lineage: Arc<dyn LineageOracle>,
    alignment: Box<dyn InputAlignment>,
    currently_copying: CurrentlyCopying,
    out_labels: Mutex<OutLabelHolder>,
    copy_lock: Mutex<()>,
    rng: Mutex<StdRng>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for LocalityScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalityScheduler")
            .field("workdir", &self.config.scheduler.workdir)
            .field("currently_copying", &self.currently_copying)
            .finish_non_exhaustive()
    }
}

impl LocalityScheduler {
    pub fn new(config: ConfigFile, lineage: Arc<dyn LineageOracle>) -> Result<Self> {
        let alignment = alignment_from_config(&config.alignment)?;
        let rng = match config.alignment.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let hierarchy = Arc::new(HierarchyWrapper::new(&config.scheduler.workdir));
        info!(
            workdir = %config.scheduler.workdir.display(),
            strategy = ?config.scheduler.strategy,
            alignment = ?config.alignment.strategy,
            "scheduler created"
        );
        Ok(Self {
            collector: InputFileCollector::new(Arc::clone(&hierarchy)),
            hierarchy,
            lineage,
            alignment,
            currently_copying: CurrentlyCopying::new(),
            out_labels: Mutex::new(OutLabelHolder::new()),
            copy_lock: Mutex::new(()),
            rng: Mutex::new(rng),
            fs: Arc::new(RealFileSystem),
            config,
        })
    }

    /// Read copy logs through `fs` instead of the local disk.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Make the tie-break reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn hierarchy(&self) -> &Arc<HierarchyWrapper> {
        &self.hierarchy
    }

    pub fn collector(&self) -> &InputFileCollector {
        &self.collector
    }

    pub fn currently_copying(&self) -> &CurrentlyCopying {
        &self.currently_copying
    }

    pub(crate) fn out_labels(&self) -> MutexGuard<'_, OutLabelHolder> {
        self.out_labels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn copy_lock(&self) -> MutexGuard<'_, ()> {
        self.copy_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn copy_limits(&self) -> CopyLimits {
        let copy = &self.config.copy;
        CopyLimits {
            max_copy_tasks_per_node: copy.max_copy_tasks_per_node,
            max_waiting_copy_tasks_per_node: copy.max_waiting_copy_tasks_per_node,
            max_held_copy_task_ready: copy.max_held_copy_task_ready,
            copy_same_task_in_parallel: copy.copy_same_task_in_parallel,
        }
    }

    fn sync_dir(&self) -> PathBuf {
        self.config.scheduler.sync_dir()
    }

    // ---------------------------------------------------------------------
    // Scheduling pass
    // ---------------------------------------------------------------------

    /// Place `tasks` on `cluster` and plan background copies for the rest.
    ///
    /// Tasks that already have a node are skipped.
    pub fn schedule(&self, tasks: &[Arc<Task>], cluster: &ClusterSnapshot) -> SchedulingOutcome {
        let _guard = self.copy_lock();
        let tasks: Vec<Arc<Task>> = tasks
            .iter()
            .filter(|t| t.node().is_none())
            .cloned()
            .collect();
        let mut available = cluster.available_by_node();

        let assignments: Vec<Assignment> = match self.config.scheduler.strategy {
            SchedulingStrategy::Cost => {
                let data: Vec<TaskData> = tasks
                    .par_iter()
                    .filter_map(|t| self.calculate_task_data(t, cluster, &available))
                    .collect();
                self.create_alignment(data, &mut available, cluster)
                    .iter()
                    .filter_map(|a| match self.commit_alignment(a) {
                        Ok(assignment) => Some(assignment),
                        Err(e) => {
                            warn!(task = %a.task.name(), node = %a.node, error = %e, "assignment failed");
                            None
                        }
                    })
                    .collect()
            }
            SchedulingStrategy::Ready => {
                let mut ready = self.tasks_with_all_data(&tasks, cluster);
                ready_to_run_to_node(&mut ready, &mut available)
                    .iter()
                    .map(|a| self.commit_ready(a))
                    .collect()
            }
        };

        let assigned: HashSet<u64> = assignments.iter().map(|a| a.task.id()).collect();
        let unscheduled: Vec<Arc<Task>> = tasks
            .into_iter()
            .filter(|t| !assigned.contains(&t.id()))
            .collect();
        let copy_tasks = self.plan_copies(&unscheduled, cluster, &mut available);

        info!(
            assigned = assignments.len(),
            unscheduled = unscheduled.len(),
            copy_tasks = copy_tasks.len(),
            "scheduling pass finished"
        );
        SchedulingOutcome {
            assignments,
            copy_tasks,
        }
    }

    /// Plan and reserve background copies for `tasks`.
    ///
    /// Runs both copy phases against the free resources of `cluster`.
    pub fn post_scheduling(&self, tasks: &[Arc<Task>], cluster: &ClusterSnapshot) -> Vec<CopyTask> {
        let _guard = self.copy_lock();
        let mut available = cluster.available_by_node();
        self.plan_copies(tasks, cluster, &mut available)
    }

    fn plan_copies(
        &self,
        tasks: &[Arc<Task>],
        cluster: &ClusterSnapshot,
        available: &mut HashMap<Location, Requirements>,
    ) -> Vec<CopyTask> {
        if tasks.is_empty() {
            return Vec::new();
        }
        let (mut stats, ready_tasks_per_node) = self.task_stats(tasks, cluster);
        if stats.is_empty() {
            return Vec::new();
        }

        let planner = CopyPlanner {
            currently_copying: &self.currently_copying,
            alignment: self.alignment.as_ref(),
            limits: self.copy_limits(),
        };
        let mut state = PlannerState {
            copying_tasks_on_node: self.currently_copying.currently_copying_tasks_on_node(),
            ready_tasks_per_node,
            ..PlannerState::default()
        };
        planner.capacity_available_to_node(&mut state, &mut stats, available, START_PRIORITY);
        let first_phase = state.alignments.len();
        planner.copy_in_advance(&mut state, &mut stats, self.config.copy.prio_phase_three);
        debug!(
            capacity_available = first_phase,
            copy_in_advance = state.alignments.len() - first_phase,
            "copy plans"
        );

        state
            .alignments
            .into_iter()
            .filter_map(|a| self.start_copy_task(a))
            .collect()
    }

    /// Statistics for every task that misses data on some node, and the
    /// number of tasks that hold or receive all data per node.
    fn task_stats(
        &self,
        tasks: &[Arc<Task>],
        cluster: &ClusterSnapshot,
    ) -> (TaskStats, HashMap<Location, usize>) {
        let results: Vec<(Option<TaskStat>, Vec<Location>)> = tasks
            .par_iter()
            .filter_map(|task| {
                let inputs = self
                    .collector
                    .inputs_of_task(task, self.lineage.as_ref(), cluster.len())
                    .ok()
                    .flatten()?;
                let mut per_node = Vec::new();
                let mut ready_on = Vec::new();
                for node in cluster.matching_nodes_for_task(task) {
                    if inputs.excluded_nodes.contains(&node.location) {
                        continue;
                    }
                    let copying = self.currently_copying.get(&node.location);
                    let Some(stats) = inputs.calculate_missing_data(&node.location, &copying) else {
                        continue;
                    };
                    if stats.all_on_node_or_copying() {
                        ready_on.push(node.location.clone());
                    }
                    per_node.push((node.location.clone(), stats));
                }
                let mut stat = TaskStat::new(Arc::clone(task), inputs);
                for (node, stats) in per_node {
                    stat.add(node, stats);
                }
                Some((stat.can_start_somewhere().then_some(stat), ready_on))
            })
            .collect();

        let mut stats = TaskStats::default();
        let mut ready_tasks_per_node: HashMap<Location, usize> = HashMap::new();
        for (stat, ready_on) in results {
            for node in ready_on {
                *ready_tasks_per_node.entry(node).or_default() += 1;
            }
            if let Some(stat) = stat {
                stats.add(stat);
            }
        }
        (stats, ready_tasks_per_node)
    }

    /// Tasks whose inputs are complete on at least one candidate node.
    fn tasks_with_all_data(&self, tasks: &[Arc<Task>], cluster: &ClusterSnapshot) -> Vec<TaskInputsNodes> {
        tasks
            .par_iter()
            .filter_map(|task| {
                let inputs = self
                    .collector
                    .inputs_of_task(task, self.lineage.as_ref(), cluster.len())
                    .ok()
                    .flatten()?;
                let nodes: Vec<Location> = cluster
                    .matching_nodes_for_task(task)
                    .filter(|n| !inputs.excluded_nodes.contains(&n.location))
                    .filter(|n| {
                        let copying = self.currently_copying.get(&n.location).all_files_currently_copying();
                        inputs.all_files_are_on_location_and_not_overwritten(&n.location, Some(&copying))
                    })
                    .map(|n| n.location.clone())
                    .collect();
                (!nodes.is_empty()).then(|| TaskInputsNodes {
                    task: Arc::clone(task),
                    nodes_with_all_data: nodes,
                    inputs,
                })
            })
            .collect()
    }

    /// Reserve a planned background copy. `None` if the reservation fails.
    fn start_copy_task(&self, alignment: NodeTaskFilesAlignment) -> Option<CopyTask> {
        let task = &alignment.task;
        let execution = format!("{}-copy-{}", task.execution(), task.next_copy_task_id());
        let inputs = CopyInputs::new(execution, self.sync_dir(), alignment.priority);
        let plan = match CopyPlan::build(task, &alignment.node, &alignment.alignment, inputs) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(task = %task.name(), node = %alignment.node, error = %e, "copy plan rejected");
                return None;
            }
        };
        let copy = CopyTask::new(
            Arc::clone(task),
            alignment.node.clone(),
            plan,
            alignment.alignment.all_location_versions(),
        );
        if let Err(e) = self
            .currently_copying
            .add(task, copy.node(), copy.files_for_current_node())
        {
            warn!(task = %task.name(), node = %copy.node(), error = %e, "copy reservation conflict");
            return None;
        }
        for version in copy.all_location_versions() {
            version.use_();
        }
        if self.config.scheduler.trace_enabled {
            task.state().trace.copy_task();
        }
        info!(
            task = %task.name(),
            node = %copy.node(),
            copy_id = copy.id(),
            bytes = copy.bytes(),
            priority = alignment.priority,
            "copy task reserved"
        );
        Some(copy)
    }

    // ---------------------------------------------------------------------
    // Commit and undo
    // ---------------------------------------------------------------------

    /// Commit a cost-driven placement.
    ///
    /// Marks every input version in use and reserves the paths the task's
    /// start copies to its node.
    pub fn assign_task_to_node(&self, alignment: &NodeTaskFilesAlignment) -> Result<Assignment> {
        let _guard = self.copy_lock();
        self.commit_alignment(alignment)
    }

    fn commit_alignment(&self, alignment: &NodeTaskFilesAlignment) -> Result<Assignment> {
        let task = &alignment.task;
        let node = &alignment.node;
        if task.node().is_some() {
            return Err(SchedulerError::TaskAlreadyAssigned(task.name().to_string()));
        }
        let inputs = CopyInputs::new(task.execution().to_string(), self.sync_dir(), alignment.priority);
        let plan = CopyPlan::build(task, node, &alignment.alignment, inputs)?;
        self.currently_copying
            .add(task, node, &plan.files_for_current_node)?;

        let versions = alignment.alignment.all_location_versions();
        for version in &versions {
            version.use_();
        }

        let mut state = task.state();
        if self.config.scheduler.trace_enabled {
            state.trace.record_alignment(node, &alignment.alignment);
        }
        state.copied_files = plan.input_files;
        state.copying_to_node = Some(plan.files_for_current_node);
        state.input_files = versions;
        state.node = Some(node.clone());
        debug!(
            task = %task.name(),
            node = %node,
            cost = alignment.alignment.cost(),
            copies = state.copied_files.len(),
            "task assigned"
        );

        Ok(Assignment {
            task: Arc::clone(task),
            node: node.clone(),
            inputs: plan.inputs,
        })
    }

    /// Commit a placement that needs no copying.
    pub fn assign_ready_task(&self, alignment: &NodeTaskLocalFilesAlignment) -> Assignment {
        let _guard = self.copy_lock();
        self.commit_ready(alignment)
    }

    fn commit_ready(&self, alignment: &NodeTaskLocalFilesAlignment) -> Assignment {
        let task = &alignment.task;
        for version in &alignment.location_versions {
            version.use_();
        }
        {
            let mut state = task.state();
            state.input_files = alignment.location_versions.clone();
            state.node = Some(alignment.node.clone());
        }
        let mut inputs = CopyInputs::new(task.execution().to_string(), self.sync_dir(), START_PRIORITY);
        inputs.symlinks = alignment.symlinks.clone();
        debug!(task = %task.name(), node = %alignment.node, "task assigned with local inputs");
        Assignment {
            task: Arc::clone(task),
            node: alignment.node.clone(),
            inputs,
        }
    }

    /// Release everything an assignment reserved. Safe to call repeatedly.
    pub fn undo_task_scheduling(&self, task: &Arc<Task>) {
        let _guard = self.copy_lock();
        let mut state = task.state();
        for version in state.input_files.drain(..) {
            version.free();
        }
        if let Some(copying) = state.copying_to_node.take() {
            self.currently_copying.remove(task, copying.node(), &copying);
        }
        state.copied_files.clear();
        if let Some(node) = state.node.take() {
            debug!(task = %task.name(), node = %node, "task scheduling undone");
        }
    }

    /// The task's start finished copying its inputs.
    ///
    /// On failure the copy log decides which files did arrive, and the
    /// task's input versions are released. Returns the reconciliation, if
    /// a log was found.
    pub fn task_init_finished(&self, task: &Arc<Task>, success: bool) -> Option<CopyLogOutcome> {
        let _guard = self.copy_lock();
        let mut state = task.state();
        if let Some(copying) = state.copying_to_node.take() {
            self.currently_copying.remove(task, copying.node(), &copying);
        }
        let copied = std::mem::take(&mut state.copied_files);
        if success {
            for file in &copied {
                file.success();
            }
            return None;
        }
        for version in state.input_files.drain(..) {
            version.free();
        }
        drop(state);
        warn!(task = %task.name(), "task start failed");
        let log = self.sync_dir().join(task.execution());
        self.reconcile_log(task.execution(), &log, &copied)
    }

    /// The task stopped running; release its input versions.
    pub fn task_finished(&self, task: &Arc<Task>) {
        let _guard = self.copy_lock();
        let mut state = task.state();
        for version in state.input_files.drain(..) {
            version.free();
        }
        if let Some(copying) = state.copying_to_node.take() {
            self.currently_copying.remove(task, copying.node(), &copying);
        }
        state.copied_files.clear();
        debug!(task = %task.name(), "task finished");
    }

    /// A background copy ended.
    ///
    /// Success registers every copied file on the target node. Failure
    /// reconciles the copy's log. Returns the reconciliation, if a log was
    /// found.
    pub fn copy_task_finished(&self, copy: &CopyTask, success: bool) -> Option<CopyLogOutcome> {
        let _guard = self.copy_lock();
        for version in copy.all_location_versions() {
            version.free();
        }
        self.currently_copying
            .remove(copy.task(), copy.node(), copy.files_for_current_node());
        if success {
            for file in copy.input_files() {
                file.success();
            }
            info!(task = %copy.task().name(), node = %copy.node(), copy_id = copy.id(), "copy finished");
            return None;
        }
        warn!(task = %copy.task().name(), node = %copy.node(), copy_id = copy.id(), "copy failed");
        self.reconcile_log(&copy.inputs().execution, &copy.inputs().log_path(), copy.input_files())
    }

    /// Drop a reserved copy that never started.
    pub fn undo_copy_task(&self, copy: &CopyTask) {
        let _guard = self.copy_lock();
        for version in copy.all_location_versions() {
            version.free();
        }
        self.currently_copying
            .remove(copy.task(), copy.node(), copy.files_for_current_node());
        debug!(task = %copy.task().name(), copy_id = copy.id(), "copy reservation undone");
    }

    fn reconcile_log(
        &self,
        execution: &str,
        path: &Path,
        files: &[TaskInputFileLocationWrapper],
    ) -> Option<CopyLogOutcome> {
        if !self.fs.exists(path) {
            debug!(execution, path = %path.display(), "no copy log, nothing was copied");
            return None;
        }
        match self.fs.read_to_string(path) {
            Ok(contents) => Some(reconcile_copy_log(execution, &contents, files)),
            Err(e) => {
                warn!(execution, path = %path.display(), error = %e, "copy log unreadable");
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Hierarchy updates
    // ---------------------------------------------------------------------

    /// Record a file no task produced, such as a workflow input.
    pub fn register_file(
        &self,
        path: &Path,
        node: &Location,
        size: u64,
        timestamp: i64,
        overwrite: bool,
    ) -> Option<Arc<LocationVersion>> {
        let version = LocationVersion::new(node.clone(), timestamp, size, None);
        self.hierarchy.add_file_overwrite(path, overwrite, version)
    }

    /// Record the outputs of `task` on the node it ran on.
    pub fn register_task_outputs(
        &self,
        task: &Arc<Task>,
        outputs: &[OutputFile],
        overwrite: bool,
    ) -> Result<Vec<Arc<LocationVersion>>> {
        let node = task
            .node()
            .ok_or_else(|| SchedulerError::UnknownTask(format!("{} has no node", task.name())))?;
        let mut registered = Vec::with_capacity(outputs.len());
        for output in outputs {
            let version = LocationVersion::new(
                node.clone(),
                output.timestamp,
                output.size,
                Some(Arc::clone(task)),
            );
            match self.hierarchy.add_file_overwrite(&output.path, overwrite, version) {
                Some(v) => registered.push(v),
                None => warn!(task = %task.name(), path = %output.path.display(), "output not registered"),
            }
        }
        debug!(task = %task.name(), node = %node, outputs = registered.len(), "outputs registered");
        Ok(registered)
    }

    /// Forget what `node` holds of `paths`. Returns how many files were known.
    pub fn invalidate_outputs(&self, node: &Location, paths: &[PathBuf]) -> usize {
        let mut count = 0;
        for path in paths {
            let file = self.hierarchy.get_file(path);
            if let Some(file) = file.as_ref().and_then(HierarchyNode::as_file) {
                file.remove_location(node);
                count += 1;
            }
        }
        debug!(node = %node, invalidated = count, "outputs invalidated");
        count
    }

    pub fn add_symlink(&self, src: &Path, dst: &Path) -> bool {
        self.hierarchy.add_symlink(src, dst)
    }

    /// Follow symlinks from `path` and report where the newest version of
    /// the file they lead to lives.
    pub fn node_of_last_file_version(&self, path: &Path) -> Result<FileLocation> {
        let mut current = path.to_path_buf();
        let mut symlinks = Vec::new();
        let mut visited = HashSet::new();
        loop {
            match self.hierarchy.get_file(&current) {
                Some(HierarchyNode::Symlink(link)) => {
                    if !visited.insert(current.clone()) {
                        return Err(SchedulerError::NotARealFile { path: current });
                    }
                    let target = link.target().to_path_buf();
                    symlinks.push(SymlinkInput::new(&current, &target));
                    current = target;
                }
                Some(HierarchyNode::File(file)) => {
                    let node = file
                        .last_update(LocationKind::Node)
                        .map(|v| v.location().clone());
                    return Ok(FileLocation {
                        path: current,
                        symlinks,
                        node,
                    });
                }
                Some(HierarchyNode::Folder(_)) => {
                    return Err(SchedulerError::NotARealFile { path: current });
                }
                None => {
                    return Ok(FileLocation {
                        path: current,
                        symlinks,
                        node: None,
                    });
                }
            }
        }
    }
}

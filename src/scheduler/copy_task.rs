// src/scheduler/copy_task.rs

//! Copy task descriptors handed to the transport, and reconciliation of a
//! failed copy from its per-file log.
//!
//! The transport appends `S-<path>` when it starts a file and `F-<path>`
//! when the file is complete. After a failure, completed files are still
//! registered on the target node and files left open are dropped there.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::alignment::FileAlignment;
use crate::copying::CurrentlyCopyingOnNode;
use crate::errors::Result;
use crate::hierarchy::RealFile;
use crate::inputs::SymlinkInput;
use crate::location::{Location, LocationVersion, registry};
use crate::workflow::Task;

static LOG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<kind>[SF])-(?P<path>.+)$").unwrap());

/// A file copied to a node, with the version it will have there.
#[derive(Debug, Clone)]
pub struct TaskInputFileLocationWrapper {
    path: String,
    file: Arc<RealFile>,
    version: Arc<LocationVersion>,
}

impl TaskInputFileLocationWrapper {
    pub fn new(path: String, file: Arc<RealFile>, version: Arc<LocationVersion>) -> Self {
        Self {
            path,
            file,
            version,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file(&self) -> &Arc<RealFile> {
        &self.file
    }

    /// The destination version, `copy_of` pointing at its source.
    pub fn version(&self) -> &Arc<LocationVersion> {
        &self.version
    }

    /// Register the copied file on its target node.
    pub fn success(&self) {
        self.file.add_or_update_location(false, Arc::clone(&self.version));
    }

    /// Drop whatever the target node holds for this file.
    pub fn failure(&self) {
        self.file.remove_location(self.version.location());
    }
}

/// Files pulled from one source node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEntry {
    pub node: Location,
    pub files: Vec<String>,
    pub bytes: u64,
}

/// Instructions the transport needs to fill a node.
#[derive(Debug, Clone, Default)]
pub struct CopyInputs {
    /// Name the transport logs under, `<sync_dir>/<execution>`.
    pub execution: String,
    pub sync_dir: PathBuf,
    /// 1..=100; speculative copies run with less.
    pub priority: u8,
    /// Largest batch first.
    pub entries: Vec<InputEntry>,
    pub symlinks: Vec<SymlinkInput>,
    /// Paths to wait for, keyed by the task copying them.
    pub wait_for_files_of_task: BTreeMap<String, Vec<String>>,
}

impl CopyInputs {
    pub fn new(execution: String, sync_dir: PathBuf, priority: u8) -> Self {
        Self {
            execution,
            sync_dir,
            priority,
            ..Self::default()
        }
    }

    pub fn wait_for_task(&mut self, waits: &HashMap<String, Arc<Task>>) {
        for (path, task) in waits {
            self.wait_for_files_of_task
                .entry(task.execution().to_string())
                .or_default()
                .push(path.clone());
        }
        for paths in self.wait_for_files_of_task.values_mut() {
            paths.sort();
        }
    }

    pub fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    }

    pub fn copies_data(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.symlinks.is_empty() && self.wait_for_files_of_task.is_empty()
    }

    pub fn log_path(&self) -> PathBuf {
        self.sync_dir.join(&self.execution)
    }
}

/// What moving a plan's files onto its node amounts to.
#[derive(Debug)]
pub struct CopyPlan {
    pub inputs: CopyInputs,
    pub input_files: Vec<TaskInputFileLocationWrapper>,
    pub files_for_current_node: Arc<CurrentlyCopyingOnNode>,
    /// Path to the task that is already copying it to the node.
    pub wait_for_task: HashMap<String, Arc<Task>>,
}

impl CopyPlan {
    /// Every file `alignment` takes from a node other than `node`.
    ///
    /// Each copied file gets a destination version derived from its source
    /// version and a reservation on `node` for `task`.
    pub fn build(
        task: &Arc<Task>,
        node: &Location,
        alignment: &FileAlignment,
        mut inputs: CopyInputs,
    ) -> Result<Self> {
        let files_for_current_node = Arc::new(CurrentlyCopyingOnNode::new(node.clone()));
        let mut input_files = Vec::new();
        let mut wait_for_task = HashMap::new();

        for (source, wrapper) in alignment.node_file_alignment() {
            if source == node {
                continue;
            }
            for waiting in wrapper.wait_for() {
                wait_for_task.insert(waiting.file.path_string(), Arc::clone(&waiting.task));
            }
            let mut paths = Vec::with_capacity(wrapper.files_to_copy().len());
            for file in wrapper.files_to_copy() {
                let path = file.path_string();
                let source_version = file
                    .triple
                    .file
                    .location_version(source)
                    .unwrap_or_else(|| Arc::clone(&file.version));
                input_files.push(TaskInputFileLocationWrapper::new(
                    path.clone(),
                    Arc::clone(&file.triple.file),
                    source_version.copy_to(node.clone()),
                ));
                files_for_current_node.add(&path, task, source)?;
                paths.push(path);
            }
            if !paths.is_empty() {
                inputs.entries.push(InputEntry {
                    node: source.clone(),
                    files: paths,
                    bytes: wrapper.to_copy_size(),
                });
            }
        }

        inputs.wait_for_task(&wait_for_task);
        inputs.symlinks.extend(alignment.symlinks().iter().cloned());
        inputs.sort_entries();

        Ok(Self {
            inputs,
            input_files,
            files_for_current_node,
            wait_for_task,
        })
    }
}

/// A background copy of a task's inputs onto one node.
#[derive(Debug, Clone)]
pub struct CopyTask {
    id: u64,
    task: Arc<Task>,
    node: Location,
    inputs: CopyInputs,
    input_files: Vec<TaskInputFileLocationWrapper>,
    files_for_current_node: Arc<CurrentlyCopyingOnNode>,
    all_location_versions: Vec<Arc<LocationVersion>>,
}

impl CopyTask {
    pub fn new(
        task: Arc<Task>,
        node: Location,
        plan: CopyPlan,
        all_location_versions: Vec<Arc<LocationVersion>>,
    ) -> Self {
        Self {
            id: registry().next_copy_task_id(),
            task,
            node,
            inputs: plan.inputs,
            input_files: plan.input_files,
            files_for_current_node: plan.files_for_current_node,
            all_location_versions,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn node(&self) -> &Location {
        &self.node
    }

    pub fn inputs(&self) -> &CopyInputs {
        &self.inputs
    }

    pub fn input_files(&self) -> &[TaskInputFileLocationWrapper] {
        &self.input_files
    }

    /// Paths this copy reserves on its node.
    pub fn files_for_current_node(&self) -> &CurrentlyCopyingOnNode {
        &self.files_for_current_node
    }

    /// Versions marked in use while the copy runs.
    pub fn all_location_versions(&self) -> &[Arc<LocationVersion>] {
        &self.all_location_versions
    }

    pub fn bytes(&self) -> u64 {
        self.inputs.entries.iter().map(|e| e.bytes).sum()
    }
}

/// One line of a transport log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyLogLine {
    Started(String),
    Finished(String),
}

/// Parse a transport log. Lines that are neither `S-` nor `F-` are ignored.
pub fn parse_copy_log(contents: &str) -> Vec<CopyLogLine> {
    contents
        .lines()
        .filter_map(|line| {
            let caps = LOG_LINE.captures(line.trim_end_matches('\r'))?;
            let path = caps["path"].to_string();
            match &caps["kind"] {
                "S" => Some(CopyLogLine::Started(path)),
                _ => Some(CopyLogLine::Finished(path)),
            }
        })
        .collect()
}

/// Outcome of reconciling a failed copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyLogOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Register every finished file and drop every file left open.
///
/// Files the log never mentions are left untouched: they were not started
/// and the node holds nothing for them.
pub fn reconcile_copy_log(
    execution: &str,
    contents: &str,
    files: &[TaskInputFileLocationWrapper],
) -> CopyLogOutcome {
    let by_path: HashMap<&str, &TaskInputFileLocationWrapper> =
        files.iter().map(|f| (f.path(), f)).collect();
    let mut open: HashSet<String> = HashSet::new();
    let mut outcome = CopyLogOutcome::default();

    for line in parse_copy_log(contents) {
        match line {
            CopyLogLine::Started(path) => {
                open.insert(path);
            }
            CopyLogLine::Finished(path) => {
                open.remove(&path);
                match by_path.get(path.as_str()) {
                    Some(file) => {
                        file.success();
                        debug!(execution, path = %path, "copied file registered");
                        outcome.succeeded.push(path);
                    }
                    None => warn!(execution, path = %path, "log names a file that was not copied"),
                }
            }
        }
    }

    let mut open: Vec<String> = open.into_iter().collect();
    open.sort();
    for path in open {
        match by_path.get(path.as_str()) {
            Some(file) => {
                file.failure();
                info!(
                    execution,
                    path = %path,
                    node = %file.version().location(),
                    "partially copied file deactivated"
                );
                outcome.failed.push(path);
            }
            None => warn!(execution, path = %path, "log names a file that was not copied"),
        }
    }
    outcome
}

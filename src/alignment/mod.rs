// src/alignment/mod.rs

//! Per-node input alignment: which files are local, which to wait for, and
//! which to copy from where, with an aggregate cost.
//!
//! [`plan_alignment`] is the shared driver. It handles files another task
//! is already copying to the node and stops early once the running cost
//! exceeds a ceiling. Strategies ([`GreedyAlignment`], [`RandomAlignment`])
//! only decide the source of each remaining file.

pub mod cost;
pub mod greedy;
pub mod random;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub use cost::{CostFunction, MinSizeCost};
pub use greedy::GreedyAlignment;
pub use random::RandomAlignment;

use crate::copying::CurrentlyCopyingOnNode;
use crate::errors::{Result, SchedulerError};
use crate::inputs::{PathFileLocationTriple, SymlinkInput, TaskInputs};
use crate::location::{Location, LocationVersion};
use crate::workflow::Task;

/// One input file paired with the version chosen for it.
#[derive(Debug, Clone)]
pub struct FilePath {
    pub triple: Arc<PathFileLocationTriple>,
    pub version: Arc<LocationVersion>,
}

impl FilePath {
    pub fn new(triple: Arc<PathFileLocationTriple>, version: Arc<LocationVersion>) -> Self {
        Self { triple, version }
    }

    pub fn path(&self) -> &Path {
        &self.triple.path
    }

    pub fn path_string(&self) -> String {
        self.triple.path_string()
    }
}

/// A file some other task is already copying to the node.
#[derive(Debug, Clone)]
pub struct FilePathWithTask {
    pub file: FilePath,
    pub task: Arc<Task>,
}

/// Files taken from one source location.
#[derive(Debug, Clone, Default)]
pub struct AlignmentWrapper {
    files_to_copy: Vec<FilePath>,
    to_copy_size: u64,
    wait_for: Vec<FilePathWithTask>,
    to_wait_size: u64,
    cost: f64,
}

impl AlignmentWrapper {
    /// `cost` is the running cost of this source after adding the file.
    pub fn add_alignment_to_copy(&mut self, file: FilePath, cost: f64, size: u64) {
        self.files_to_copy.push(file);
        self.to_copy_size += size;
        self.cost = cost;
    }

    pub fn add_alignment_to_wait_for(&mut self, file: FilePathWithTask, size: u64) {
        self.wait_for.push(file);
        self.to_wait_size += size;
    }

    pub fn files_to_copy(&self) -> &[FilePath] {
        &self.files_to_copy
    }

    pub fn wait_for(&self) -> &[FilePathWithTask] {
        &self.wait_for
    }

    pub fn to_copy_size(&self) -> u64 {
        self.to_copy_size
    }

    pub fn to_wait_size(&self) -> u64 {
        self.to_wait_size
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn is_empty(&self) -> bool {
        self.files_to_copy.is_empty() && self.wait_for.is_empty()
    }

    /// Copied and awaited files together.
    pub fn all(&self) -> impl Iterator<Item = &FilePath> {
        self.files_to_copy
            .iter()
            .chain(self.wait_for.iter().map(|w| &w.file))
    }
}

/// Complete plan for running a task on one node.
///
/// Files whose chosen version already sits on the node are kept under the
/// node's own key; they cost nothing and are never copied.
#[derive(Debug, Clone)]
pub struct FileAlignment {
    node_file_alignment: BTreeMap<Location, AlignmentWrapper>,
    symlinks: Vec<SymlinkInput>,
    cost: f64,
    weight: f64,
}

impl FileAlignment {
    pub fn new(
        node_file_alignment: BTreeMap<Location, AlignmentWrapper>,
        symlinks: Vec<SymlinkInput>,
        cost: f64,
    ) -> Self {
        Self {
            node_file_alignment,
            symlinks,
            cost,
            weight: 1.0,
        }
    }

    pub fn node_file_alignment(&self) -> &BTreeMap<Location, AlignmentWrapper> {
        &self.node_file_alignment
    }

    pub fn symlinks(&self) -> &[SymlinkInput] {
        &self.symlinks
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Cost scaled by affinity; lower is better.
    pub fn worth(&self) -> f64 {
        self.cost / self.weight
    }

    /// Data has to be copied from at least one location other than `node`.
    pub fn copy_from_somewhere(&self, node: &Location) -> bool {
        self.node_file_alignment
            .iter()
            .any(|(loc, w)| loc != node && !w.files_to_copy.is_empty())
    }

    /// Every version the plan reads, local, awaited or copied.
    pub fn all_location_versions(&self) -> Vec<Arc<LocationVersion>> {
        self.node_file_alignment
            .values()
            .flat_map(|w| w.all().map(|f| Arc::clone(&f.version)))
            .collect()
    }

    /// Bytes that still have to cross the network to reach `node`.
    pub fn bytes_to_copy(&self, node: &Location) -> u64 {
        self.node_file_alignment
            .iter()
            .filter(|(loc, _)| *loc != node)
            .map(|(_, w)| w.to_copy_size)
            .sum()
    }

    /// Bytes some other task is already bringing to the node.
    pub fn bytes_to_wait_for(&self) -> u64 {
        self.node_file_alignment.values().map(|w| w.to_wait_size).sum()
    }
}

/// Running totals of a plan under construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Costs {
    pub max_cost_for_individual_node: f64,
    pub sum_of_costs: f64,
    pub calculated_cost: f64,
}

/// Strategy choosing a source for each file that is not already arriving.
pub trait InputAlignment: Send + Sync {
    /// How much the most expensive single source weighs against the total.
    fn weight_for_individual_node(&self) -> f64;

    /// Pick a source for one file, record it in `map`, and return the new
    /// totals.
    fn find_alignment_for_file(
        &self,
        file: &Arc<PathFileLocationTriple>,
        node: &Location,
        map: &mut BTreeMap<Location, AlignmentWrapper>,
        costs: Costs,
    ) -> Costs;

    fn calculate_cost(&self, max_individual: f64, sum_of_costs: f64) -> f64 {
        let w = self.weight_for_individual_node();
        max_individual * w + sum_of_costs * (1.0 - w)
    }

    /// Plan `inputs` onto `node`. See [`plan_alignment`].
    fn input_alignment(
        &self,
        inputs: &TaskInputs,
        node: &Location,
        currently_copying: Option<&CurrentlyCopyingOnNode>,
        planned_to_copy: Option<&CurrentlyCopyingOnNode>,
        max_cost: f64,
    ) -> Result<Option<FileAlignment>> {
        plan_alignment(self, inputs, node, currently_copying, planned_to_copy, max_cost)
    }
}

pub(crate) fn validate_weight(weight: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(SchedulerError::InvalidWeight(weight));
    }
    Ok(weight)
}

/// If `path` is already on its way to the node, the version being copied.
fn already_copying(
    copying: Option<&CurrentlyCopyingOnNode>,
    file: &PathFileLocationTriple,
) -> Result<Option<(Arc<LocationVersion>, Arc<Task>)>> {
    let Some(copying) = copying else {
        return Ok(None);
    };
    let path = file.path_string();
    let Some(source) = copying.copy_source(&path) else {
        return Ok(None);
    };
    match file.version_on_location(&source.location) {
        Some(version) => Ok(Some((Arc::clone(version), source.task))),
        None => Err(SchedulerError::NoAlignmentPossible(format!(
            "node is already copying {path} but in an incompatible version"
        ))),
    }
}

fn wait_for_other_task(
    copying: Option<&CurrentlyCopyingOnNode>,
    file: &Arc<PathFileLocationTriple>,
    map: &mut BTreeMap<Location, AlignmentWrapper>,
) -> Result<bool> {
    let Some((version, task)) = already_copying(copying, file)? else {
        return Ok(false);
    };
    let size = version.size();
    map.entry(version.location().clone())
        .or_default()
        .add_alignment_to_wait_for(
            FilePathWithTask {
                file: FilePath::new(Arc::clone(file), version),
                task,
            },
            size,
        );
    Ok(true)
}

/// Build the alignment of `inputs` onto `node`.
///
/// Files already being copied to the node, either by a running copy or by
/// a copy planned earlier in this pass, are awaited instead of copied
/// again. Every other file goes through the strategy.
///
/// Returns `Ok(None)` as soon as the running cost exceeds `max_cost`; costs
/// only grow as files are added, so the finished plan could not have been
/// cheaper. Returns [`SchedulerError::NoAlignmentPossible`] when the node is
/// receiving a path in a version the task cannot use.
pub fn plan_alignment<A: InputAlignment + ?Sized>(
    strategy: &A,
    inputs: &TaskInputs,
    node: &Location,
    currently_copying: Option<&CurrentlyCopyingOnNode>,
    planned_to_copy: Option<&CurrentlyCopyingOnNode>,
    max_cost: f64,
) -> Result<Option<FileAlignment>> {
    let mut map: BTreeMap<Location, AlignmentWrapper> = BTreeMap::new();
    let mut costs = Costs::default();

    for file in &inputs.files {
        if wait_for_other_task(currently_copying, file, &mut map)?
            || wait_for_other_task(planned_to_copy, file, &mut map)?
        {
            continue;
        }
        if file.locations.is_empty() {
            return Err(SchedulerError::NoAlignmentPossible(format!(
                "no admissible version of {}",
                file.path.display()
            )));
        }
        costs = strategy.find_alignment_for_file(file, node, &mut map, costs);
        if costs.calculated_cost > max_cost {
            return Ok(None);
        }
    }

    Ok(Some(FileAlignment::new(
        map,
        inputs.symlinks.clone(),
        costs.calculated_cost,
    )))
}

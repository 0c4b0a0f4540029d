// src/inputs/mod.rs

//! Resolved inputs of a task: which versions of which files it may read.

pub mod collector;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub use collector::InputFileCollector;

use crate::copying::CurrentlyCopyingOnNode;
use crate::hierarchy::RealFile;
use crate::location::{Location, LocationVersion};

/// A symlink the task's working directory must recreate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymlinkInput {
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl SymlinkInput {
    pub fn new(src: &Path, dst: &Path) -> Self {
        Self {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        }
    }
}

/// One input file with the versions the task may use.
#[derive(Debug)]
pub struct PathFileLocationTriple {
    pub path: PathBuf,
    pub file: Arc<RealFile>,
    pub locations: Vec<Arc<LocationVersion>>,
    size: OnceLock<u64>,
}

impl PathFileLocationTriple {
    pub fn new(path: PathBuf, file: Arc<RealFile>, locations: Vec<Arc<LocationVersion>>) -> Self {
        Self {
            path,
            file,
            locations,
            size: OnceLock::new(),
        }
    }

    /// Average size over the admissible versions.
    pub fn size(&self) -> u64 {
        *self.size.get_or_init(|| {
            if self.locations.is_empty() {
                return 0;
            }
            let total: u64 = self.locations.iter().map(|v| v.size()).sum();
            total / self.locations.len() as u64
        })
    }

    pub fn min_size(&self) -> u64 {
        self.locations.iter().map(|v| v.size()).min().unwrap_or(0)
    }

    pub fn version_on_location(&self, location: &Location) -> Option<&Arc<LocationVersion>> {
        self.locations.iter().find(|v| v.location() == location)
    }

    pub fn located_on_location(&self, location: &Location) -> bool {
        self.version_on_location(location).is_some()
    }

    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl PartialEq for PathFileLocationTriple {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && Arc::ptr_eq(&self.file, &other.file)
            && self.locations.len() == other.locations.len()
            && self
                .locations
                .iter()
                .zip(&other.locations)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// How much of a task's input sits on, or is moving to, one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskNodeStats {
    pub size_remaining: u64,
    pub size_currently_copying: u64,
    pub size_on_node: u64,
}

impl TaskNodeStats {
    pub fn task_size(&self) -> u64 {
        self.size_remaining + self.size_currently_copying + self.size_on_node
    }

    pub fn all_on_node(&self) -> bool {
        self.size_remaining == 0 && self.size_currently_copying == 0
    }

    pub fn all_on_node_or_copying(&self) -> bool {
        self.size_remaining == 0
    }
}

/// Inputs of one task, resolved for one scheduling attempt.
#[derive(Debug)]
pub struct TaskInputs {
    pub symlinks: Vec<SymlinkInput>,
    pub files: Vec<Arc<PathFileLocationTriple>>,
    pub excluded_nodes: HashSet<Location>,
    sorted: bool,
}

impl TaskInputs {
    pub fn new(
        symlinks: Vec<SymlinkInput>,
        files: Vec<Arc<PathFileLocationTriple>>,
        excluded_nodes: HashSet<Location>,
    ) -> Self {
        Self {
            symlinks,
            files,
            excluded_nodes,
            sorted: false,
        }
    }

    /// Every file has a version on `location` and none of them is being
    /// replaced there.
    pub fn all_files_are_on_location_and_not_overwritten(
        &self,
        location: &Location,
        paths_currently_copying: Option<&HashSet<String>>,
    ) -> bool {
        self.files.iter().all(|f| {
            f.located_on_location(location)
                && !paths_currently_copying.is_some_and(|c| c.contains(&f.path_string()))
        })
    }

    /// The version of each file stored on `location`.
    ///
    /// Files without a version there are skipped.
    pub fn all_location_versions_on_location(&self, location: &Location) -> Vec<Arc<LocationVersion>> {
        self.files
            .iter()
            .filter_map(|f| f.version_on_location(location).cloned())
            .collect()
    }

    /// Bytes of input already on `location`.
    pub fn calculate_data_on_node(&self, location: &Location) -> u64 {
        self.files
            .iter()
            .filter(|f| f.located_on_location(location))
            .map(|f| f.size())
            .sum()
    }

    /// Split the input into on-node, in-flight and missing bytes for
    /// `location`.
    ///
    /// Returns `None` if a path is being copied there in a version the task
    /// cannot use.
    pub fn calculate_missing_data(
        &self,
        location: &Location,
        currently_copying: &CurrentlyCopyingOnNode,
    ) -> Option<TaskNodeStats> {
        let mut stats = TaskNodeStats::default();
        for file in &self.files {
            let min_size = file.min_size();
            if file.located_on_location(location) {
                stats.size_on_node += min_size;
                continue;
            }
            match currently_copying.copy_source(&file.path_string()) {
                Some(source) if file.located_on_location(&source.location) => {
                    stats.size_currently_copying += min_size;
                }
                Some(_) => return None,
                None => stats.size_remaining += min_size,
            }
        }
        Some(stats)
    }

    /// Sum of the average sizes of all files.
    pub fn calculate_avg_size(&self) -> u64 {
        self.files.iter().map(|f| f.size()).sum()
    }

    /// Order files by size, largest first. Only sorts once.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.files.sort_by_key(|f| std::cmp::Reverse(f.size()));
            self.sorted = true;
        }
    }
}

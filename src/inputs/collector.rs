// src/inputs/collector.rs

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{Result, SchedulerError};
use crate::hierarchy::{HierarchyNode, HierarchyWrapper};
use crate::workflow::{LineageOracle, Task};

use super::{PathFileLocationTriple, SymlinkInput, TaskInputs};

/// Walks a task's declared inputs through the hierarchy.
#[derive(Debug, Clone)]
pub struct InputFileCollector {
    hierarchy: Arc<HierarchyWrapper>,
}

impl InputFileCollector {
    pub fn new(hierarchy: Arc<HierarchyWrapper>) -> Self {
        Self { hierarchy }
    }

    /// Resolve every input of `task`, expanding directories and following
    /// symlinks.
    ///
    /// Inputs outside the hierarchy or not (yet) known to it are skipped.
    /// Returns `Ok(None)` once the excluded locations cover all
    /// `number_of_nodes` nodes, since the task could not run anywhere.
    pub fn inputs_of_task(
        &self,
        task: &Task,
        lineage: &dyn LineageOracle,
        number_of_nodes: usize,
    ) -> Result<Option<TaskInputs>> {
        let mut to_process: Vec<(Option<HierarchyNode>, PathBuf)> = task
            .inputs()
            .iter()
            .filter(|p| self.hierarchy.is_in_scope(p))
            .map(|p| (self.hierarchy.get_file(p), p.clone()))
            .collect();
        to_process.reverse();

        let mut symlinks = Vec::new();
        let mut files = Vec::new();
        let mut excluded = HashSet::new();
        let mut visited_links: HashSet<PathBuf> = HashSet::new();
        let mut seen_files: HashSet<PathBuf> = HashSet::new();

        while excluded.len() < number_of_nodes {
            let Some((node, path)) = to_process.pop() else {
                break;
            };
            let Some(node) = node else {
                continue;
            };
            match node {
                HierarchyNode::Symlink(link) => {
                    if !visited_links.insert(path.clone()) {
                        warn!(task = %task.name(), path = %path.display(), "symlink cycle");
                        continue;
                    }
                    let target = link.target().to_path_buf();
                    symlinks.push(SymlinkInput::new(&path, &target));
                    to_process.push((self.hierarchy.get_file(&target), target));
                }
                HierarchyNode::Folder(folder) => {
                    for (child_path, child) in folder.all_children(&path) {
                        to_process.push((Some(child), child_path));
                    }
                }
                HierarchyNode::File(file) => {
                    if !seen_files.insert(path.clone()) {
                        continue;
                    }
                    let Some(matching) = file.files_for_task(task, lineage) else {
                        debug!(task = %task.name(), path = %path.display(), "no alignment for input");
                        return Err(SchedulerError::NoAlignmentFound { path });
                    };
                    excluded.extend(matching.excluded);
                    files.push(Arc::new(PathFileLocationTriple::new(
                        path,
                        file,
                        matching.matching,
                    )));
                }
            }
        }

        if excluded.len() >= number_of_nodes {
            debug!(task = %task.name(), "every node is excluded");
            return Ok(None);
        }

        let mut inputs = TaskInputs::new(symlinks, files, excluded);
        inputs.sort();
        Ok(Some(inputs))
    }
}

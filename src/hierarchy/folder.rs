// src/hierarchy/folder.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::location::LocationVersion;

use super::{HierarchyNode, RealFile, Symlink};

/// Directory node with a concurrent child map.
#[derive(Debug, Default)]
pub struct Folder {
    children: DashMap<String, HierarchyNode>,
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<HierarchyNode> {
        self.children.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Return the child folder `name`, creating it if absent.
    ///
    /// A file or symlink occupying the name is replaced: the path is now a
    /// directory.
    pub fn get_or_create_folder(&self, name: &str) -> Arc<Folder> {
        match self.children.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if let HierarchyNode::Folder(folder) = entry.get() {
                    return Arc::clone(folder);
                }
                debug!(name, "replacing file with folder");
                let folder = Arc::new(Folder::new());
                entry.insert(HierarchyNode::Folder(Arc::clone(&folder)));
                folder
            }
            Entry::Vacant(entry) => {
                let folder = Arc::new(Folder::new());
                entry.insert(HierarchyNode::Folder(Arc::clone(&folder)));
                folder
            }
        }
    }

    /// Store `version` for the file `name`.
    ///
    /// Returns `None` when a folder already occupies `name`. A symlink is
    /// replaced by the new file.
    pub fn add_or_update_file(
        &self,
        name: &str,
        overwrite: bool,
        version: Arc<LocationVersion>,
    ) -> Option<Arc<LocationVersion>> {
        // The entry guard must be released before the file's own lock is taken.
        let existing = match self.children.entry(name.to_string()) {
            Entry::Occupied(mut entry) => match entry.get() {
                HierarchyNode::Folder(_) => return None,
                HierarchyNode::File(file) => Arc::clone(file),
                HierarchyNode::Symlink(_) => {
                    entry.insert(HierarchyNode::File(Arc::new(RealFile::new(Arc::clone(
                        &version,
                    )))));
                    return Some(version);
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(HierarchyNode::File(Arc::new(RealFile::new(Arc::clone(
                    &version,
                )))));
                return Some(version);
            }
        };
        Some(existing.add_or_update_location(overwrite, version))
    }

    /// Record `name` as a symlink to `target`.
    pub fn add_symlink(&self, name: &str, target: &Path) -> bool {
        let link = Symlink::new(target);
        match self.children.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                let same = matches!(entry.get(), HierarchyNode::Symlink(s) if **s == link);
                if !same {
                    entry.insert(HierarchyNode::Symlink(Arc::new(link)));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(HierarchyNode::Symlink(Arc::new(link)));
            }
        }
        true
    }

    /// All files and symlinks below this folder, keyed by their path under
    /// `current_path`.
    pub fn all_children(&self, current_path: &Path) -> BTreeMap<PathBuf, HierarchyNode> {
        let mut result = BTreeMap::new();
        self.collect_children(current_path, &mut result);
        result
    }

    fn collect_children(&self, current_path: &Path, result: &mut BTreeMap<PathBuf, HierarchyNode>) {
        // Snapshot first so no shard lock is held while descending.
        let entries: Vec<(String, HierarchyNode)> = self
            .children
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        for (name, node) in entries {
            let path = current_path.join(&name);
            match node {
                HierarchyNode::Folder(folder) => folder.collect_children(&path, result),
                other => {
                    result.insert(path, other);
                }
            }
        }
    }
}

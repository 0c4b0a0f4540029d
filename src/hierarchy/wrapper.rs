// src/hierarchy/wrapper.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::errors::{Result, SchedulerError};
use crate::location::{Location, LocationKind, LocationVersion};

use super::path_utils::{normalize, relative_segments};
use super::{Folder, HierarchyNode};

/// Entry point to the hierarchy of one shared working directory.
///
/// Paths below the workdir look like `<workdir>/<h1>/<h2>/...`, where
/// `h1/h2` identifies one task's working directory. Each such pair gets its
/// own root folder so unrelated executions never touch the same map.
#[derive(Debug)]
pub struct HierarchyWrapper {
    workdir: PathBuf,
    roots: DashMap<String, Arc<Folder>>,
}

impl HierarchyWrapper {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: normalize(workdir.as_ref()),
            roots: DashMap::with_capacity(2),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_in_scope(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.workdir)
    }

    fn root(&self, segments: &mut std::slice::Iter<'_, String>, create: bool) -> Option<Arc<Folder>> {
        let first = segments.next()?;
        let second = segments.next()?;
        let key = format!("{first}{second}");
        if create {
            return Some(Arc::clone(
                self.roots.entry(key).or_insert_with(|| Arc::new(Folder::new())).value(),
            ));
        }
        self.roots.get(&key).map(|r| Arc::clone(r.value()))
    }

    /// Tree node for `path`, or `None` if out of scope or missing.
    pub fn get_file(&self, path: &Path) -> Option<HierarchyNode> {
        let segments = relative_segments(&self.workdir, path)?;
        let mut iter = segments.iter();
        let mut current = self.root(&mut iter, false)?;
        let mut remaining = iter.peekable();
        if remaining.peek().is_none() {
            return Some(HierarchyNode::Folder(current));
        }
        while let Some(name) = remaining.next() {
            let node = current.get(name)?;
            if remaining.peek().is_none() {
                return Some(node);
            }
            match node {
                HierarchyNode::Folder(folder) => current = folder,
                _ => return None,
            }
        }
        None
    }

    /// All files and symlinks below the directory at `path`.
    ///
    /// Returns `None` if `path` is not a directory in the hierarchy. A
    /// workdir prefix shorter than a root key is never a directory.
    pub fn get_all_files_in_dir(&self, path: &Path) -> Option<BTreeMap<PathBuf, HierarchyNode>> {
        match self.get_file(path)? {
            HierarchyNode::Folder(folder) => Some(folder.all_children(&normalize(path))),
            _ => None,
        }
    }

    fn find_folder_to_insert(&self, path: &Path) -> Option<(Arc<Folder>, String)> {
        let segments = relative_segments(&self.workdir, path)?;
        let (file_name, dirs) = segments.split_last()?;
        let mut iter = dirs.iter();
        let mut current = self.root(&mut iter, true)?;
        for name in iter {
            current = current.get_or_create_folder(name);
        }
        Some((current, file_name.clone()))
    }

    /// Same as [`add_file_overwrite`](Self::add_file_overwrite) without
    /// overwriting.
    pub fn add_file(&self, path: &Path, version: Arc<LocationVersion>) -> Option<Arc<LocationVersion>> {
        self.add_file_overwrite(path, false, version)
    }

    /// Store `version` for the file at `path`, creating folders as needed.
    ///
    /// Returns `None` if `path` is outside every root, names a root itself,
    /// or collides with an existing folder.
    pub fn add_file_overwrite(
        &self,
        path: &Path,
        overwrite: bool,
        version: Arc<LocationVersion>,
    ) -> Option<Arc<LocationVersion>> {
        let Some((folder, name)) = self.find_folder_to_insert(path) else {
            debug!(path = %path.display(), "path outside hierarchy");
            return None;
        };
        folder.add_or_update_file(&name, overwrite, version)
    }

    pub fn add_symlink(&self, src: &Path, dst: &Path) -> bool {
        match self.find_folder_to_insert(src) {
            Some((folder, name)) => folder.add_symlink(&name, dst),
            None => false,
        }
    }

    /// Node holding the most recently created version of the file at `path`.
    pub fn node_of_last_file_version(&self, path: &Path) -> Option<Location> {
        let file = self.get_file(path)?;
        let version = file.as_file()?.last_update(LocationKind::Node)?;
        Some(version.location().clone())
    }

    /// Active version of the file at `path` on `location`.
    pub fn location_version(&self, path: &Path, location: &Location) -> Result<Arc<LocationVersion>> {
        self.get_file(path)
            .as_ref()
            .and_then(HierarchyNode::as_file)
            .and_then(|f| f.location_version(location))
            .ok_or_else(|| SchedulerError::LocationNotFound {
                path: path.to_path_buf(),
                location: location.clone(),
            })
    }
}

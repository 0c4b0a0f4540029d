// src/hierarchy/mod.rs

//! Per-logical-path tree of files and the versions stored for them.
//!
//! The tree mirrors the shared working directory:
//!
//! - [`wrapper`] shards roots by a two-segment working-directory prefix and
//!   resolves absolute paths to tree nodes.
//! - [`folder`] holds a concurrent child map.
//! - [`real_file`] holds one logical file's versions across locations and
//!   answers which of them a task may read.
//!
//! Folders are safe under concurrent insertion (`DashMap`); a file's version
//! list is serialised per file.

pub mod folder;
pub mod path_utils;
pub mod real_file;
pub mod wrapper;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use folder::Folder;
pub use real_file::{MatchingLocations, RealFile};
pub use wrapper::HierarchyWrapper;

/// Symlink recorded in the hierarchy; resolved lazily by whoever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
    target: PathBuf,
}

impl Symlink {
    pub fn new(target: &Path) -> Self {
        Self {
            target: path_utils::normalize(target),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// One entry of a [`Folder`].
#[derive(Debug, Clone)]
pub enum HierarchyNode {
    Folder(Arc<Folder>),
    File(Arc<RealFile>),
    Symlink(Arc<Symlink>),
}

impl HierarchyNode {
    pub fn is_directory(&self) -> bool {
        matches!(self, HierarchyNode::Folder(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, HierarchyNode::Symlink(_))
    }

    pub fn as_file(&self) -> Option<&Arc<RealFile>> {
        match self {
            HierarchyNode::File(f) => Some(f),
            _ => None,
        }
    }
}

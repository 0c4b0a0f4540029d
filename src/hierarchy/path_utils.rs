// src/hierarchy/path_utils.rs

//! Lexical path helpers for the file hierarchy.
//!
//! Paths in the hierarchy are logical: they name files on the shared
//! working directory as the workflow engine reports them, and may not exist
//! on the machine running the scheduler. Nothing here touches the
//! filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` at the root stays at the root, like `/..` does on POSIX.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.is_absolute() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Segments of `path` below `root`, both normalised first.
///
/// Returns `None` if `path` does not lie under `root`.
pub fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let path = normalize(path);
    let rel = path.strip_prefix(root).ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
    )
}

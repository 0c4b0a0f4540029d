// src/location/mod.rs

//! Places where file data can live, and the versions observed there.
//!
//! - [`registry`] interns node locations and hands out version / task ids.
//! - [`version`] holds [`LocationVersion`], one observed instance of a file
//!   on one location.

pub mod registry;
pub mod version;

use std::fmt;
use std::sync::Arc;

pub use registry::{LocationRegistry, registry};
pub use version::LocationVersion;

/// Kind of a [`Location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKind {
    /// A cluster node that can run tasks and store files.
    Node,
}

/// Identity of a place where data can reside.
///
/// Locations are interned by the [`LocationRegistry`], so two locations with
/// the same kind and identifier are the same place. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    kind: LocationKind,
    identifier: Arc<str>,
}

impl Location {
    pub(crate) fn new(kind: LocationKind, identifier: Arc<str>) -> Self {
        Self { kind, identifier }
    }

    /// Shorthand for `registry().node(name)`.
    pub fn node(name: &str) -> Self {
        registry().node(name)
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LocationKind::Node => write!(f, "Node({})", self.identifier),
        }
    }
}

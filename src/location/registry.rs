// src/location/registry.rs

//! Process-wide registry for location identities and monotonic ids.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use super::{Location, LocationKind};

static REGISTRY: OnceLock<LocationRegistry> = OnceLock::new();

/// Access the global registry, creating it on first use.
pub fn registry() -> &'static LocationRegistry {
    REGISTRY.get_or_init(LocationRegistry::new)
}

/// Interns node locations and owns the id counters for versions, tasks and
/// copy tasks.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    nodes: Mutex<HashMap<String, Location>>,
    next_version_id: AtomicU64,
    next_task_id: AtomicU64,
    next_copy_task_id: AtomicU64,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the interned node location for `name`.
    pub fn node(&self, name: &str) -> Location {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = nodes.get(name) {
            return existing.clone();
        }
        let location = Location::new(LocationKind::Node, Arc::from(name));
        nodes.insert(name.to_string(), location.clone());
        debug!(node = %name, "registered node location");
        location
    }

    /// Number of interned locations.
    pub fn len(&self) -> usize {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn next_version_id(&self) -> u64 {
        self.next_version_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_task_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_copy_task_id(&self) -> u64 {
        self.next_copy_task_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Forget all interned locations and restart the version counter.
    ///
    /// Locations handed out earlier keep comparing equal to re-interned ones
    /// with the same name. Task and copy task ids are never reused, since
    /// both are keyed by id.
    pub fn reset(&self) {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.next_version_id.store(0, Ordering::Relaxed);
    }
}

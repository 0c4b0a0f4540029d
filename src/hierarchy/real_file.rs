// src/hierarchy/real_file.rs

//! One logical file and the versions observed for it on each location.
//!
//! [`RealFile::files_for_task`] decides which of those versions a task may
//! read. Versions are classified by the producing step relative to the
//! task's step:
//!
//! - **current**: same step;
//! - **ancestor**: a strict ancestor step, trimmed to the closest producers;
//! - **descendant**: a strict descendant step;
//! - **unrelated**: everything else with a producer;
//! - **initial**: no producer (pre-staged data).
//!
//! Without initial versions every group is admissible. With initial versions
//! only the newest initial versions are kept, and the other groups only
//! contribute versions created at or after them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::location::{Location, LocationKind, LocationVersion};
use crate::workflow::{LineageOracle, Task};

/// Admissible versions of one file for one task, plus the locations that
/// must not be picked as the task's node.
#[derive(Debug, Clone)]
pub struct MatchingLocations {
    pub matching: Vec<Arc<LocationVersion>>,
    pub excluded: HashSet<Location>,
}

/// A version with the fields classification needs, read once.
struct Candidate {
    version: Arc<LocationVersion>,
    create_time: i64,
    in_use: bool,
    producer_step: Option<String>,
}

/// One logical file path.
///
/// The version list is copy-on-write: readers grab the current `Arc` and
/// never block writers for longer than a pointer swap.
#[derive(Debug)]
pub struct RealFile {
    versions: Mutex<Arc<Vec<Arc<LocationVersion>>>>,
}

impl RealFile {
    pub fn new(version: Arc<LocationVersion>) -> Self {
        Self {
            versions: Mutex::new(Arc::new(vec![version])),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Vec<Arc<LocationVersion>>>> {
        self.versions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every version ever stored, active or not.
    pub fn versions(&self) -> Arc<Vec<Arc<LocationVersion>>> {
        Arc::clone(&self.lock())
    }

    /// Store `version`, reusing the record already kept for its location.
    ///
    /// For the same location the stored record is updated when
    /// `overwrite` is set or `version` is newer. With `overwrite`, versions on
    /// every other location are deactivated. Returns the record now
    /// representing `version` in this file.
    pub fn add_or_update_location(
        &self,
        overwrite: bool,
        version: Arc<LocationVersion>,
    ) -> Arc<LocationVersion> {
        let mut guard = self.lock();
        let mut to_update: Option<Arc<LocationVersion>> = None;

        for existing in guard.iter() {
            if existing.location() == version.location() {
                to_update = Some(Arc::clone(existing));
                if overwrite || version.timestamp() > existing.timestamp() {
                    if let Err(err) = existing.update(&version) {
                        warn!(error = %err, "failed to update location version");
                    }
                }
                if !overwrite {
                    return Arc::clone(existing);
                }
            } else if overwrite {
                existing.deactivate();
            }
        }

        if let Some(existing) = to_update {
            return existing;
        }

        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(Arc::clone(&version));
        *guard = Arc::new(next);
        trace!(location = %version.location(), "added location version");
        version
    }

    /// Deactivate every version stored for `location`.
    pub fn remove_location(&self, location: &Location) {
        for v in self.versions().iter() {
            if v.location() == location {
                v.deactivate();
            }
        }
    }

    /// Most recently created active version on a location of `kind`.
    pub fn last_update(&self, kind: LocationKind) -> Option<Arc<LocationVersion>> {
        let mut last: Option<(i64, Arc<LocationVersion>)> = None;
        for v in self.versions().iter() {
            if !v.is_active() || v.location().kind() != kind {
                continue;
            }
            let created = v.create_time();
            if last.as_ref().is_none_or(|(t, _)| *t < created) {
                last = Some((created, Arc::clone(v)));
            }
        }
        last.map(|(_, v)| v)
    }

    /// Active version stored on `location`.
    pub fn location_version(&self, location: &Location) -> Option<Arc<LocationVersion>> {
        self.versions()
            .iter()
            .find(|v| v.location() == location && v.is_active())
            .cloned()
    }

    /// Versions `task` may read, or `None` if there is none.
    pub fn files_for_task(
        &self,
        task: &Task,
        lineage: &dyn LineageOracle,
    ) -> Option<MatchingLocations> {
        let versions = self.versions();
        let step = task.step().name();

        let mut in_use: HashSet<Location> = HashSet::new();
        let mut current = Vec::new();
        let mut ancestors = Vec::new();
        let mut descendants = Vec::new();
        let mut unrelated = Vec::new();
        let mut initial = Vec::new();

        for version in versions.iter() {
            let snap = version.snapshot();
            if snap.in_use > 0 {
                in_use.insert(version.location().clone());
            }
            if !snap.active {
                continue;
            }
            let candidate = Candidate {
                version: Arc::clone(version),
                create_time: snap.create_time,
                in_use: snap.in_use > 0,
                producer_step: snap.created_by.as_ref().map(|t| t.step().name().to_string()),
            };
            match candidate.producer_step.as_deref() {
                None => initial.push(candidate),
                Some(p) if p == step => current.push(candidate),
                Some(p) if lineage.is_ancestor(p, step) => ancestors.push(candidate),
                Some(p) if lineage.is_descendant(p, step) => descendants.push(candidate),
                Some(_) => unrelated.push(candidate),
            }
        }

        let ancestors = closest_ancestors(ancestors, lineage);

        let merged = if initial.is_empty() {
            let mut merged = current;
            merged.extend(ancestors);
            merged.extend(unrelated);
            merged.extend(descendants);
            merged
        } else {
            merge_with_initial(initial, current, ancestors, unrelated, descendants)
        };

        if merged.is_empty() {
            trace!(task = %task.name(), "no admissible version");
            return None;
        }

        for c in &merged {
            if c.in_use {
                in_use.remove(c.version.location());
            }
        }

        let mut matching: Vec<Arc<LocationVersion>> =
            merged.into_iter().map(|c| c.version).collect();
        matching.sort_by_key(|v| v.id());

        Some(MatchingLocations {
            matching,
            excluded: in_use,
        })
    }
}

/// Keep only ancestor versions whose producer is not itself an ancestor of
/// another kept producer.
///
/// Producers of the same step never dominate each other. Incomparable
/// producers are all kept.
fn closest_ancestors(ancestors: Vec<Candidate>, lineage: &dyn LineageOracle) -> Vec<Candidate> {
    if ancestors.len() < 2 {
        return ancestors;
    }
    let steps: HashSet<String> = ancestors
        .iter()
        .filter_map(|c| c.producer_step.clone())
        .collect();
    ancestors
        .into_iter()
        .filter(|c| {
            let Some(step) = c.producer_step.as_deref() else {
                return true;
            };
            !steps.iter().any(|other| lineage.is_descendant(other, step))
        })
        .collect()
}

fn merge_with_initial(
    initial: Vec<Candidate>,
    current: Vec<Candidate>,
    ancestors: Vec<Candidate>,
    unrelated: Vec<Candidate>,
    descendants: Vec<Candidate>,
) -> Vec<Candidate> {
    let baseline = initial
        .iter()
        .map(|c| c.create_time)
        .max()
        .unwrap_or_default();

    let mut result: Vec<Candidate> = initial
        .into_iter()
        .filter(|c| c.create_time == baseline)
        .collect();

    let use_ancestors = current.is_empty();
    let later = |c: &Candidate| c.create_time >= baseline;

    result.extend(current.into_iter().filter(later));
    if use_ancestors {
        result.extend(ancestors.into_iter().filter(later));
    }
    result.extend(unrelated.into_iter().filter(later));
    result.extend(descendants.into_iter().filter(later));
    result
}

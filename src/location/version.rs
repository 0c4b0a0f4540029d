// src/location/version.rs

//! One observed instance of a file on one location.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::errors::{Result, SchedulerError};
use crate::workflow::Task;

use super::{Location, registry};

#[derive(Debug, Clone)]
struct VersionState {
    timestamp: i64,
    size: u64,
    create_time: i64,
    created_by: Option<Arc<Task>>,
    copy_of: Option<Arc<LocationVersion>>,
    active: bool,
    in_use: u32,
}

/// A timestamped, sized, provenance-tagged instance of a file at a
/// [`Location`].
///
/// Versions are shared as `Arc<LocationVersion>`: the hierarchy, task inputs
/// and copy reservations all point at the same record. The id and location
/// never change; everything else sits behind a mutex.
pub struct LocationVersion {
    id: u64,
    location: Location,
    state: Mutex<VersionState>,
}

/// Point-in-time copy of the mutable part of a [`LocationVersion`].
#[derive(Debug, Clone)]
pub struct VersionSnapshot {
    pub timestamp: i64,
    pub size: u64,
    pub create_time: i64,
    pub created_by: Option<Arc<Task>>,
    pub copy_of: Option<Arc<LocationVersion>>,
    pub active: bool,
    pub in_use: u32,
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

impl LocationVersion {
    /// Register a version observed now.
    pub fn new(
        location: Location,
        timestamp: i64,
        size: u64,
        created_by: Option<Arc<Task>>,
    ) -> Arc<Self> {
        Self::with_create_time(location, timestamp, size, created_by, now_millis())
    }

    /// Register a version with an explicit local creation time.
    pub fn with_create_time(
        location: Location,
        timestamp: i64,
        size: u64,
        created_by: Option<Arc<Task>>,
        create_time: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: registry().next_version_id(),
            location,
            state: Mutex::new(VersionState {
                timestamp,
                size,
                create_time,
                created_by,
                copy_of: None,
                active: true,
                in_use: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VersionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn timestamp(&self) -> i64 {
        self.lock().timestamp
    }

    pub fn size(&self) -> u64 {
        self.lock().size
    }

    pub fn create_time(&self) -> i64 {
        self.lock().create_time
    }

    pub fn created_by(&self) -> Option<Arc<Task>> {
        self.lock().created_by.clone()
    }

    pub fn copy_of(&self) -> Option<Arc<LocationVersion>> {
        self.lock().copy_of.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn snapshot(&self) -> VersionSnapshot {
        let s = self.lock();
        VersionSnapshot {
            timestamp: s.timestamp,
            size: s.size,
            create_time: s.create_time,
            created_by: s.created_by.clone(),
            copy_of: s.copy_of.clone(),
            active: s.active,
            in_use: s.in_use,
        }
    }

    /// Overwrite this version's mutable fields with `other`'s.
    ///
    /// Both versions must describe the same location. The in-use counter is
    /// kept, since readers of the old data still hold it.
    pub fn update(&self, other: &LocationVersion) -> Result<()> {
        if self.location != other.location {
            return Err(SchedulerError::LocationMismatch {
                expected: self.location.clone(),
                actual: other.location.clone(),
            });
        }
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        let incoming = other.snapshot();
        let mut s = self.lock();
        s.timestamp = incoming.timestamp;
        s.size = incoming.size;
        s.create_time = incoming.create_time;
        s.created_by = incoming.created_by;
        s.copy_of = incoming.copy_of;
        s.active = incoming.active;
        trace!(id = self.id, location = %self.location, "updated location version");
        Ok(())
    }

    pub fn deactivate(&self) {
        self.lock().active = false;
    }

    /// Mark the version as read, written or copied by someone.
    pub fn use_(&self) {
        self.lock().in_use += 1;
    }

    /// Release one [`use_`](Self::use_).
    pub fn free(&self) {
        let mut s = self.lock();
        s.in_use = s.in_use.saturating_sub(1);
    }

    pub fn in_use_count(&self) -> u32 {
        self.lock().in_use
    }

    /// A fresh version at `location` carrying this version's data.
    ///
    /// `copy_of` always points at the first version of the chain, so
    /// provenance never forms a cycle.
    pub fn copy_to(self: &Arc<Self>, location: Location) -> Arc<LocationVersion> {
        let s = self.snapshot();
        let origin = s.copy_of.unwrap_or_else(|| Arc::clone(self));
        let copy = Self::new(location, s.timestamp, s.size, s.created_by);
        copy.lock().copy_of = Some(origin);
        copy
    }
}

impl PartialEq for LocationVersion {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.location != other.location {
            return false;
        }
        let a = self.snapshot();
        let b = other.snapshot();
        a.timestamp == b.timestamp
            && a.size == b.size
            && a.created_by.as_ref().map(|t| t.id()) == b.created_by.as_ref().map(|t| t.id())
            && match (&a.copy_of, &b.copy_of) {
                (None, None) => true,
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
    }
}

impl fmt::Debug for LocationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot();
        f.debug_struct("LocationVersion")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("active", &s.active)
            .field("timestamp", &s.timestamp)
            .field("in_use", &s.in_use)
            .field("size", &s.size)
            .field("create_time", &s.create_time)
            .field("created_by", &s.created_by.as_ref().map(|t| t.name().to_string()))
            .field("copy_of", &s.copy_of.as_ref().map(|c| c.id()))
            .finish()
    }
}

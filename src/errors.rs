// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Resolution and alignment failures are ordinary, recoverable values: the
//! scheduling pass logs them and moves on to the next task or node.

use std::path::PathBuf;

use thiserror::Error;

use crate::location::Location;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Weight for individual node must be between 0 and 1 (got {0})")]
    InvalidWeight(f64),

    /// No admissible version of a file exists for the requesting task.
    #[error("No alignment found for {}", path.display())]
    NoAlignmentFound { path: PathBuf },

    /// A specific node cannot host the task (incompatible copy in flight).
    #[error("No alignment possible: {0}")]
    NoAlignmentPossible(String),

    /// A path was reserved twice on the same node.
    #[error("File {} is already being copied to {node}", path)]
    CopyReservationConflict { path: String, node: Location },

    /// The copy transport could not take a request.
    #[error("Copy execution failed: {0}")]
    CopyExecutionFailure(String),

    #[error("No active version of {} on {location}", path.display())]
    LocationNotFound { path: PathBuf, location: Location },

    #[error("Can only update a location version with the same location ({expected} != {actual})")]
    LocationMismatch { expected: Location, actual: Location },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {0} is already assigned to a node")]
    TaskAlreadyAssigned(String),

    /// A path resolved to a directory or to a symlink loop.
    #[error("{} is not a regular file", path.display())]
    NotARealFile { path: PathBuf },

    #[error("Cycle detected in workflow graph: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;

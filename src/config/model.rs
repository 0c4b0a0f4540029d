// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{AlignmentStrategy, CostFunctionKind, LogLevel, SchedulingStrategy};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [scheduler]
/// workdir = "/data/work"
/// strategy = "cost"
///
/// [copy]
/// max_copy_tasks_per_node = 2
///
/// [alignment]
/// strategy = "greedy"
/// weight_for_individual_node = 0.5
/// ```
///
/// Only `[scheduler].workdir` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub copy: CopySection,

    #[serde(default)]
    pub alignment: AlignmentSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub copy: CopySection,
    pub alignment: AlignmentSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        copy: CopySection,
        alignment: AlignmentSection,
    ) -> Self {
        Self {
            scheduler,
            copy,
            alignment,
        }
    }

    /// Defaults for everything but the working directory.
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self::new_unchecked(
            SchedulerSection::new(workdir.into()),
            CopySection::default(),
            AlignmentSection::default(),
        )
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Shared working directory every tracked path lives under.
    pub workdir: PathBuf,

    /// Per-node directory; copy logs are written to `<local_workdir>/sync/`.
    #[serde(default = "default_local_workdir")]
    pub local_workdir: PathBuf,

    #[serde(default)]
    pub strategy: SchedulingStrategy,

    /// Fill each task's trace record while scheduling.
    #[serde(default)]
    pub trace_enabled: bool,

    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

impl SchedulerSection {
    pub fn new(workdir: PathBuf) -> Self {
        Self {
            workdir,
            local_workdir: default_local_workdir(),
            strategy: SchedulingStrategy::default(),
            trace_enabled: false,
            log_level: None,
        }
    }

    /// Directory holding the per-execution copy logs.
    pub fn sync_dir(&self) -> PathBuf {
        self.local_workdir.join("sync")
    }
}

fn default_local_workdir() -> PathBuf {
    PathBuf::from("/localwork")
}

/// `[copy]` section: caps on background copying.
#[derive(Debug, Clone, Deserialize)]
pub struct CopySection {
    /// Tasks copying to one node at the same time.
    #[serde(default = "default_one")]
    pub max_copy_tasks_per_node: usize,

    /// Prefetch copies one pass may start per node.
    #[serde(default = "default_one")]
    pub max_waiting_copy_tasks_per_node: usize,

    /// Tasks a node may hold ready through prefetching.
    #[serde(default = "default_max_held_copy_task_ready")]
    pub max_held_copy_task_ready: usize,

    /// Priority of prefetch copies, 1..=100.
    #[serde(default = "default_prio_phase_three")]
    pub prio_phase_three: u8,

    /// Nodes one task's inputs may be copied to at the same time.
    #[serde(default = "default_copy_same_task_in_parallel")]
    pub copy_same_task_in_parallel: usize,
}

fn default_one() -> usize {
    1
}

fn default_max_held_copy_task_ready() -> usize {
    3
}

fn default_prio_phase_three() -> u8 {
    70
}

fn default_copy_same_task_in_parallel() -> usize {
    2
}

impl Default for CopySection {
    fn default() -> Self {
        Self {
            max_copy_tasks_per_node: default_one(),
            max_waiting_copy_tasks_per_node: default_one(),
            max_held_copy_task_ready: default_max_held_copy_task_ready(),
            prio_phase_three: default_prio_phase_three(),
            copy_same_task_in_parallel: default_copy_same_task_in_parallel(),
        }
    }
}

/// `[alignment]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentSection {
    #[serde(default)]
    pub strategy: AlignmentStrategy,

    #[serde(default)]
    pub cost_function: CostFunctionKind,

    /// Fixed cost of using one more source node.
    #[serde(default)]
    pub init_cost: f64,

    /// Share of the cost taken from the most expensive source, in [0, 1].
    #[serde(default)]
    pub weight_for_individual_node: f64,

    /// Free-resource shares closer than this count as equal in tie-breaks.
    #[serde(default = "default_stalemate_threshold")]
    pub stalemate_threshold: f64,

    /// Alignments whose worth differs by less than this are comparable.
    #[serde(default = "default_comparable_cost_epsilon")]
    pub comparable_cost_epsilon: f64,

    /// Seed for the tie-break and random alignment; random if unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_stalemate_threshold() -> f64 {
    0.05
}

fn default_comparable_cost_epsilon() -> f64 {
    1e-8
}

impl Default for AlignmentSection {
    fn default() -> Self {
        Self {
            strategy: AlignmentStrategy::default(),
            cost_function: CostFunctionKind::default(),
            init_cost: 0.0,
            weight_for_individual_node: 0.0,
            stalemate_threshold: default_stalemate_threshold(),
            comparable_cost_epsilon: default_comparable_cost_epsilon(),
            seed: None,
        }
    }
}

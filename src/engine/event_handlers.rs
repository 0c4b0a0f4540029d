// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cluster::ClusterSnapshot;
use crate::scheduler::{Assignment, CopyTask, LocalityScheduler};
use crate::workflow::Task;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Bind these tasks to their nodes and start them.
    Assign(Vec<Assignment>),
    /// Hand these reserved copies to the transport.
    StartCopies(Vec<CopyTask>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Run one pass and remember every copy it reserved.
pub fn handle_scheduling_pass(
    scheduler: &LocalityScheduler,
    in_flight: &mut HashMap<u64, CopyTask>,
    tasks: &[Arc<Task>],
    cluster: &ClusterSnapshot,
) -> CoreStep {
    let outcome = scheduler.schedule(tasks, cluster);
    let mut commands = Vec::new();

    if !outcome.assignments.is_empty() {
        commands.push(CoreCommand::Assign(outcome.assignments));
    }
    if !outcome.copy_tasks.is_empty() {
        for copy in &outcome.copy_tasks {
            in_flight.insert(copy.id(), copy.clone());
        }
        commands.push(CoreCommand::StartCopies(outcome.copy_tasks));
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

pub fn handle_copy_finished(
    scheduler: &LocalityScheduler,
    in_flight: &mut HashMap<u64, CopyTask>,
    copy_id: u64,
    success: bool,
) -> CoreStep {
    match in_flight.remove(&copy_id) {
        Some(copy) => {
            if let Some(outcome) = scheduler.copy_task_finished(&copy, success) {
                debug!(
                    copy_id,
                    succeeded = outcome.succeeded.len(),
                    failed = outcome.failed.len(),
                    "copy log reconciled"
                );
            }
        }
        None => warn!(copy_id, "finish reported for unknown copy"),
    }
    CoreStep::idle()
}

/// The transport refused the copy; give its reservation back.
pub fn handle_copy_start_failed(
    scheduler: &LocalityScheduler,
    in_flight: &mut HashMap<u64, CopyTask>,
    copy_id: u64,
) -> CoreStep {
    match in_flight.remove(&copy_id) {
        Some(copy) => scheduler.undo_copy_task(&copy),
        None => warn!(copy_id, "start failure reported for unknown copy"),
    }
    CoreStep::idle()
}

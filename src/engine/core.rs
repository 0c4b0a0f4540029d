// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`SchedulerEvent`]s and produces a list of commands for
//! the IO shell. It has no channels and performs no IO of its own, so it can
//! be driven directly from tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::SchedulerEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_copy_finished, handle_copy_start_failed, handle_scheduling_pass,
};
use crate::scheduler::{CopyTask, LocalityScheduler};

/// Pure core runtime state.
///
/// Owns the scheduler handle and the background copies that were handed out
/// and have not reported back yet.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Arc<LocalityScheduler>,
    in_flight: HashMap<u64, CopyTask>,
}

impl CoreRuntime {
    pub fn new(scheduler: Arc<LocalityScheduler>) -> Self {
        Self {
            scheduler,
            in_flight: HashMap::new(),
        }
    }

    pub fn scheduler(&self) -> &Arc<LocalityScheduler> {
        &self.scheduler
    }

    /// Copies handed out and not finished yet.
    pub fn copies_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_copying(&self, copy_id: u64) -> bool {
        self.in_flight.contains_key(&copy_id)
    }

    /// Handle a single event and return the commands for the IO shell.
    pub fn step(&mut self, event: SchedulerEvent) -> CoreStep {
        match event {
            SchedulerEvent::SchedulingPass { tasks, cluster } => {
                handle_scheduling_pass(&self.scheduler, &mut self.in_flight, &tasks, &cluster)
            }
            SchedulerEvent::CopyFinished { copy_id, success } => {
                handle_copy_finished(&self.scheduler, &mut self.in_flight, copy_id, success)
            }
            SchedulerEvent::CopyStartFailed { copy_id } => {
                handle_copy_start_failed(&self.scheduler, &mut self.in_flight, copy_id)
            }
            SchedulerEvent::TaskInitFinished { task, success } => {
                self.scheduler.task_init_finished(&task, success);
                CoreStep::idle()
            }
            SchedulerEvent::TaskFinished { task } => {
                self.scheduler.task_finished(&task);
                CoreStep::idle()
            }
            SchedulerEvent::TaskRemoved { task } => {
                self.scheduler.undo_task_scheduling(&task);
                CoreStep::idle()
            }
            SchedulerEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

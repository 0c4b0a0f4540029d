// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::CopyRunner;
use crate::scheduler::{Assignment, CopyTask};

use super::core::CoreRuntime;
use super::{CoreCommand, SchedulerEvent};

/// Drives the scheduler in response to `SchedulerEvent`s and delegates
/// copies and task starts to a `CopyRunner`.
///
/// All scheduling semantics live in `CoreRuntime`; this struct only reads
/// events and executes the commands the core returns.
pub struct Runtime<R: CopyRunner> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<SchedulerEvent>,
    runner: R,
}

impl<R: CopyRunner> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<R: CopyRunner> Runtime<R> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<SchedulerEvent>, runner: R) -> Self {
        Self {
            core,
            event_rx,
            runner,
        }
    }

    /// Main event loop. Returns the core when the channel closes or a
    /// shutdown is requested.
    pub async fn run(mut self) -> Result<CoreRuntime> {
        info!("scheduler runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!(copies_in_flight = self.core.copies_in_flight(), "runtime exiting");
        Ok(self.core)
    }

    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::Assign(assignments) => self.start_tasks(assignments).await,
            CoreCommand::StartCopies(copies) => self.start_copies(copies).await,
        }
    }

    /// A task the runner refuses is unwound and the rest of the batch still
    /// starts.
    async fn start_tasks(&mut self, assignments: Vec<Assignment>) {
        for assignment in assignments {
            debug!(task = %assignment.task.name(), node = %assignment.node, "starting task");
            let task = Arc::clone(&assignment.task);
            if let Err(e) = self.runner.start_task(assignment).await {
                warn!(task = %task.name(), error = %e, "task could not be started");
                self.core.step(SchedulerEvent::TaskRemoved { task });
            }
        }
    }

    /// A copy the runner refuses gives its reservation back at once.
    async fn start_copies(&mut self, copies: Vec<CopyTask>) {
        for copy in copies {
            let copy_id = copy.id();
            if let Err(e) = self.runner.start_copy(copy).await {
                warn!(copy_id, error = %e, "copy could not be started");
                self.core.step(SchedulerEvent::CopyStartFailed { copy_id });
            }
        }
    }
}

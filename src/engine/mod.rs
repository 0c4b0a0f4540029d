// src/engine/mod.rs

//! Event loop around the scheduler.
//!
//! The pure core state machine lives in [`core`]: it feeds events into
//! [`LocalityScheduler`](crate::scheduler::LocalityScheduler) and answers with
//! commands. The async shell in [`runtime`] reads events from a channel and
//! hands the commands to a [`CopyRunner`](crate::exec::CopyRunner).

use std::sync::Arc;

use crate::cluster::ClusterSnapshot;
use crate::workflow::Task;

/// Events flowing into the runtime from the cluster and the copy transport.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Run one scheduling pass over `tasks`.
    SchedulingPass {
        tasks: Vec<Arc<Task>>,
        cluster: ClusterSnapshot,
    },
    /// A background copy ended.
    CopyFinished { copy_id: u64, success: bool },
    /// A background copy could not be started.
    CopyStartFailed { copy_id: u64 },
    /// The start of an assigned task finished copying its inputs.
    TaskInitFinished { task: Arc<Task>, success: bool },
    /// An assigned task stopped running.
    TaskFinished { task: Arc<Task> },
    /// A task was withdrawn before it ran.
    TaskRemoved { task: Arc<Task> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;

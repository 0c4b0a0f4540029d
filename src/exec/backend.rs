// src/exec/backend.rs

//! Pluggable copy transport abstraction.
//!
//! The runtime talks to a `CopyRunner` instead of a raw mpsc sender, so tests
//! can swap in a fake that records what it was given.
//!
//! `ChannelCopyRunner` is the default implementation. It forwards every
//! request over an mpsc channel to whatever drives the actual transfers.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::errors::{Result, SchedulerError};
use crate::scheduler::{Assignment, CopyTask};

/// Trait abstracting how copies and task starts are carried out.
pub trait CopyRunner: Send {
    /// Start a reserved background copy.
    ///
    /// An error means the copy never started; its reservation is undone.
    fn start_copy(&mut self, copy: CopyTask) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Bind a task to its node and start it.
    fn start_task(
        &mut self,
        assignment: Assignment,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// A request handed to the transport.
#[derive(Debug, Clone)]
pub enum CopyRequest {
    Copy(CopyTask),
    Start(Assignment),
}

/// Forwards requests over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelCopyRunner {
    tx: mpsc::Sender<CopyRequest>,
}

impl ChannelCopyRunner {
    pub fn new(tx: mpsc::Sender<CopyRequest>) -> Self {
        Self { tx }
    }

    /// A runner and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CopyRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Fails with `CopyExecutionFailure` once the transport has gone away.
    fn send(&self, request: CopyRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        Box::pin(async move {
            tx.send(request).await.map_err(|e| {
                let what = match e.0 {
                    CopyRequest::Copy(copy) => format!("copy {}", copy.id()),
                    CopyRequest::Start(assignment) => format!("start of {}", assignment.task.name()),
                };
                SchedulerError::CopyExecutionFailure(format!("{what}: copy transport channel closed"))
            })
        })
    }
}

impl CopyRunner for ChannelCopyRunner {
    fn start_copy(&mut self, copy: CopyTask) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.send(CopyRequest::Copy(copy))
    }

    fn start_task(
        &mut self,
        assignment: Assignment,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.send(CopyRequest::Start(assignment))
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;

use locality_scheduler::engine::SchedulerEvent;
use locality_scheduler::errors::Result;
use locality_scheduler::exec::CopyRunner;
use locality_scheduler::scheduler::{Assignment, CopyTask};

/// A fake copy transport that:
/// - records which copies and task starts it was given
/// - immediately reports `CopyFinished` with the configured outcome,
///   or refuses every copy if `refuse_copies` is set
/// - refuses every task start if `refuse_tasks` is set.
pub struct FakeCopyRunner {
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    pub copies: Arc<Mutex<Vec<u64>>>,
    pub started: Arc<Mutex<Vec<String>>>,
    copy_success: bool,
    refuse_copies: bool,
    refuse_tasks: bool,
}

impl FakeCopyRunner {
    pub fn new(runtime_tx: mpsc::Sender<SchedulerEvent>) -> Self {
        Self {
            runtime_tx,
            copies: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(Mutex::new(Vec::new())),
            copy_success: true,
            refuse_copies: false,
            refuse_tasks: false,
        }
    }

    pub fn failing_copies(mut self) -> Self {
        self.copy_success = false;
        self
    }

    pub fn refusing_copies(mut self) -> Self {
        self.refuse_copies = true;
        self
    }

    pub fn refusing_tasks(mut self) -> Self {
        self.refuse_tasks = true;
        self
    }
}

impl CopyRunner for FakeCopyRunner {
    fn start_copy(&mut self, copy: CopyTask) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let copies = Arc::clone(&self.copies);
        let success = self.copy_success;
        let refuse = self.refuse_copies;

        Box::pin(async move {
            if refuse {
                return Err(anyhow!("transport unavailable").into());
            }
            copies.lock().unwrap().push(copy.id());
            // Report from a separate task so the runtime is not blocked on its
            // own channel.
            tokio::spawn(async move {
                let _ = tx
                    .send(SchedulerEvent::CopyFinished {
                        copy_id: copy.id(),
                        success,
                    })
                    .await;
            });
            Ok(())
        })
    }

    fn start_task(
        &mut self,
        assignment: Assignment,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let started = Arc::clone(&self.started);
        let refuse = self.refuse_tasks;
        Box::pin(async move {
            if refuse {
                return Err(anyhow!("node rejected the pod").into());
            }
            started.lock().unwrap().push(assignment.task.name().to_string());
            Ok(())
        })
    }
}

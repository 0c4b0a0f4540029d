// src/lib.rs

pub mod alignment;
pub mod cluster;
pub mod config;
pub mod copying;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod hierarchy;
pub mod inputs;
pub mod location;
pub mod logging;
pub mod scheduler;
pub mod types;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::load_and_validate;
use crate::engine::{CoreRuntime, Runtime, SchedulerEvent};
use crate::exec::CopyRunner;
use crate::scheduler::LocalityScheduler;
use crate::workflow::LineageOracle;

/// Build a scheduler from a config file.
///
/// Installs the global log subscriber with `[scheduler].log_level`, or the
/// level from the environment if it is unset. A subscriber that is already
/// installed is kept.
pub fn scheduler_from_config(
    config_path: impl AsRef<Path>,
    lineage: Arc<dyn LineageOracle>,
) -> Result<Arc<LocalityScheduler>> {
    let cfg = load_and_validate(config_path.as_ref())?;
    if let Err(e) = logging::init_logging(cfg.scheduler.log_level) {
        eprintln!("{e}");
    }
    info!(config = %config_path.as_ref().display(), "configuration loaded");
    Ok(Arc::new(LocalityScheduler::new(cfg, lineage)?))
}

/// Spawn the event loop for `scheduler` on the current Tokio runtime.
///
/// Returns the sender events are fed through and the handle of the loop,
/// which yields the core once the loop stops. Ctrl-C requests a shutdown.
pub fn spawn_runtime<R>(
    scheduler: Arc<LocalityScheduler>,
    runner: R,
    capacity: usize,
) -> (mpsc::Sender<SchedulerEvent>, JoinHandle<errors::Result<CoreRuntime>>)
where
    R: CopyRunner + 'static,
{
    let (tx, rx) = mpsc::channel::<SchedulerEvent>(capacity);

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(SchedulerEvent::ShutdownRequested).await;
        });
    }

    let runtime = Runtime::new(CoreRuntime::new(scheduler), rx, runner);
    let handle = tokio::spawn(runtime.run());
    (tx, handle)
}

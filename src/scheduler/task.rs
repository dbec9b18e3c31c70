/*!
 * Scheduler Task
 *
 * Dedicated thread running the dispatch loop. The loop never polls: each
 * iteration blocks inside `Dispatcher::dispatch_next` until the CPU is free
 * and a process is ready, or dispatch is stopped.
 *
 * # Shutdown
 *
 * Preferred: stop dispatch on the kernel, then `join()` the task.
 * Fallback: dropping an unjoined task detaches the thread and logs a warning.
 */

use super::traits::{DispatchOutcome, Dispatcher};
use crate::core::limits::SCHEDULER_THREAD_NAME;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, trace, warn};

/// Handle to the dispatch loop thread
pub struct SchedulerTask {
    handle: Option<JoinHandle<u64>>,
}

impl SchedulerTask {
    /// Spawn the dispatch loop
    pub fn spawn(dispatcher: Arc<dyn Dispatcher>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(SCHEDULER_THREAD_NAME.into())
            .spawn(move || run_dispatch_loop(dispatcher))?;

        info!("Scheduler task spawned");
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the loop to exit (dispatch must already be stopped)
    ///
    /// Returns the number of dispatch decisions the loop made.
    pub fn join(mut self) -> u64 {
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(dispatched)) => {
                info!(dispatched, "Scheduler task shutdown complete");
                dispatched
            }
            Some(Err(_)) => {
                warn!("Scheduler task panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for SchedulerTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("SchedulerTask dropped without join - detaching dispatch thread");
        }
    }
}

fn run_dispatch_loop(dispatcher: Arc<dyn Dispatcher>) -> u64 {
    info!("Dispatch loop started");
    let mut dispatched = 0u64;

    loop {
        match dispatcher.dispatch_next() {
            DispatchOutcome::Dispatched(pid) => {
                dispatched += 1;
                trace!(%pid, "Dispatch decision");
            }
            DispatchOutcome::Stopped => break,
        }
    }

    info!(dispatched, "Dispatch loop stopped");
    dispatched
}

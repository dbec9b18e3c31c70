/*!
 * Scheduler
 *
 * Single-CPU dispatcher state: the ready queues, the CPU slot and the delta
 * queue used to expire time slices. Each structure has its own lock; the
 * lock order is run state, then delta queue.
 */

pub mod clock;
pub mod delta_queue;
pub mod ready_queue;
pub mod stats;
pub mod task;
pub mod traits;

pub use clock::ClockTask;
pub use delta_queue::{DelayReason, DeltaQueue, Expiry};
pub use ready_queue::ReadyQueue;
pub use stats::{AtomicSchedulerStats, SchedulerStats};
pub use task::SchedulerTask;
pub use traits::{DispatchOutcome, Dispatcher, TickSink};

use crate::core::types::{Pid, ProcessClass, Ticks};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::info;

/// Ready queues plus the CPU slot (guarded together)
#[derive(Debug)]
pub struct RunState {
    pub ready: ReadyQueue,
    /// Process holding the CPU
    pub current: Option<Pid>,
    /// Cleared by `stop_scheduler`
    pub dispatching: bool,
}

/// Dispatcher state shared by the kernel, the dispatch loop and the clock
pub struct Scheduler {
    run: Mutex<RunState>,
    wake: Condvar,
    delta: Mutex<DeltaQueue>,
    quantum: Ticks,
    stats: AtomicSchedulerStats,
}

impl Scheduler {
    pub fn new(quantum: Ticks, ready_capacity: Option<usize>) -> Self {
        info!(quantum, ?ready_capacity, "Scheduler initialized");

        Self {
            run: Mutex::new(RunState {
                ready: ReadyQueue::new(ready_capacity),
                current: None,
                dispatching: false,
            }),
            wake: Condvar::new(),
            delta: Mutex::new(DeltaQueue::new()),
            quantum,
            stats: AtomicSchedulerStats::new(quantum),
        }
    }

    #[inline]
    pub fn lock_run(&self) -> MutexGuard<'_, RunState> {
        self.run.lock()
    }

    /// Delta queue lock (take after the run lock when both are needed)
    #[inline]
    pub fn lock_delta(&self) -> MutexGuard<'_, DeltaQueue> {
        self.delta.lock()
    }

    /// Wake the dispatch loop (new ready process, CPU freed, or stop)
    #[inline]
    pub fn notify(&self) {
        self.wake.notify_all();
    }

    #[inline(always)]
    pub fn quantum(&self) -> Ticks {
        self.quantum
    }

    #[inline(always)]
    pub fn counters(&self) -> &AtomicSchedulerStats {
        &self.stats
    }

    /// Get scheduler statistics (lock-free snapshot)
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    pub fn set_dispatching(&self, dispatching: bool) -> bool {
        let mut run = self.run.lock();
        let previous = run.dispatching;
        run.dispatching = dispatching;
        drop(run);
        self.notify();
        previous
    }

    /// Block until the CPU is free and a process is ready
    ///
    /// On success the chosen process already occupies the CPU slot and the
    /// run lock is still held so the caller can finish the transition.
    /// Returns `None` once dispatch is stopped.
    pub fn select_next(&self) -> Option<(MutexGuard<'_, RunState>, ProcessClass, Pid)> {
        let mut run = self.run.lock();
        loop {
            if !run.dispatching {
                return None;
            }
            if run.current.is_none() {
                if let Some((class, pid)) = run.ready.dequeue_next() {
                    run.current = Some(pid);
                    return Some((run, class, pid));
                }
            }
            self.wake.wait(&mut run);
        }
    }
}

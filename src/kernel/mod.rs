/*!
 * Kernel
 *
 * Public runtime API: spawning processes, semaphores, termination and the
 * scheduler lifecycle. A `Kernel` is a cheap clonable handle; every clone
 * drives the same process table, semaphore arena and dispatcher.
 *
 * # Execution model
 *
 * One logical CPU. Each process runs on its own host thread, but a thread
 * only executes while its process holds the turn granted by the dispatcher.
 * Preemption is cooperative: a time slice that expires is noticed at the
 * process's next kernel call (`wait`, `yield_now`, `sleep`, `checkpoint`).
 */

mod context;
mod invariants;
mod transitions;

pub use context::ProcessContext;
pub use invariants::InvariantViolation;

use crate::core::config::{ClockMode, KernelConfig};
use crate::core::errors::{KernelError, KernelResult};
use crate::core::limits::PROCESS_THREAD_PREFIX;
use crate::core::types::{Pid, ProcessClass, ProcessState, SemaphoreHandle, Ticks};
use crate::monitoring::ProcessSpan;
use crate::process::{ExitStatus, Process, ProcessInfo, ProcessResult, ProcessTable};
use crate::scheduler::{ClockTask, Dispatcher, Scheduler, SchedulerStats, SchedulerTask, TickSink};
use crate::sync::SemaphoreTable;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Dispatcher and clock threads owned while the scheduler runs
#[derive(Default)]
struct Lifecycle {
    task: Option<SchedulerTask>,
    clock: Option<ClockTask>,
}

pub(crate) struct KernelInner {
    config: KernelConfig,
    processes: ProcessTable,
    semaphores: SemaphoreTable,
    scheduler: Scheduler,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle to a dispatch kernel
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        info!(
            quantum = config.quantum_ticks,
            clock = ?config.clock,
            ready_capacity = ?config.ready_capacity,
            "Kernel initialized"
        );

        let scheduler = Scheduler::new(config.quantum_ticks, config.ready_capacity);
        Ok(Self {
            inner: Arc::new(KernelInner {
                config,
                processes: ProcessTable::new(),
                semaphores: SemaphoreTable::new(),
                scheduler,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        })
    }

    /// Kernel configured from `RTK_*` environment variables
    pub fn from_env() -> KernelResult<Self> {
        Self::new(KernelConfig::from_env()?)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    /// Create a process in the Ready state at the tail of its class queue
    ///
    /// `entry` runs on a dedicated thread once the process is first
    /// dispatched. Returning `Err` or panicking terminates the process with
    /// a failed status; the scheduler keeps running.
    pub fn spawn<F>(&self, name: &str, class: ProcessClass, entry: F) -> KernelResult<Pid>
    where
        F: FnOnce(ProcessContext) -> ProcessResult + Send + 'static,
    {
        let inner = &self.inner;
        inner.scheduler.lock_run().ready.admit(class)?;

        let pid = inner.processes.next_pid();
        let gate = inner.semaphores.create_gate();
        let process = Arc::new(Process::new(pid, name, class, Arc::clone(&gate)));

        // The thread parks on its gate until the first dispatch
        let ctx = ProcessContext::new(self.clone(), pid);
        let thread_process = Arc::clone(&process);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", PROCESS_THREAD_PREFIX, pid))
            .spawn(move || run_process(thread_process, ctx, entry));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                inner.semaphores.remove(gate.handle());
                inner.scheduler.lock_run().ready.retire(class);
                warn!(%pid, name, error = %e, "Failed to spawn process thread");
                return Err(KernelError::SpawnFailed(e.to_string()));
            }
        };

        process.set_thread(handle);
        inner.admit(process);

        info!(%pid, name, %class, "Process spawned");
        inner.audit();
        Ok(pid)
    }

    pub fn create_semaphore(&self, initial_count: u32) -> SemaphoreHandle {
        let handle = self.inner.semaphores.create(initial_count).handle();
        debug!(sem = %handle, initial_count, "Semaphore created");
        handle
    }

    /// Destroy a semaphore; any waiters are released with `InvalidHandle`
    pub fn destroy_semaphore(&self, handle: SemaphoreHandle) -> KernelResult<()> {
        self.inner.destroy_semaphore(handle)
    }

    /// Semaphore wait as the process executing on the calling thread
    pub fn wait(&self, handle: SemaphoreHandle) -> KernelResult<()> {
        let pid = self.current_pid().ok_or(KernelError::NotAProcess)?;
        self.inner.wait_as(pid, handle)
    }

    /// Semaphore signal; callable from any thread
    pub fn signal(&self, handle: SemaphoreHandle) -> KernelResult<()> {
        self.inner.signal(handle)
    }

    /// Unlink a process from every structure and release its gate
    pub fn terminate(&self, pid: Pid) -> KernelResult<()> {
        self.inner.terminate_with(pid, ExitStatus::Killed)
    }

    /// Start the dispatch loop (and the timer thread in interval mode)
    pub fn start_scheduler(&self) -> KernelResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.task.is_some() {
            return Err(KernelError::SchedulerRunning);
        }

        self.inner.scheduler.set_dispatching(true);
        let dispatcher: Arc<dyn Dispatcher> = self.inner.clone();
        let task = match SchedulerTask::spawn(dispatcher) {
            Ok(task) => task,
            Err(e) => {
                self.inner.scheduler.set_dispatching(false);
                return Err(KernelError::SpawnFailed(e.to_string()));
            }
        };

        if let ClockMode::Interval(period) = self.inner.config.clock {
            let sink: Arc<dyn TickSink> = self.inner.clone();
            match ClockTask::spawn(sink, period) {
                Ok(clock) => lifecycle.clock = Some(clock),
                Err(e) => {
                    self.inner.scheduler.set_dispatching(false);
                    task.join();
                    return Err(KernelError::SpawnFailed(e.to_string()));
                }
            }
        }

        lifecycle.task = Some(task);
        info!("Scheduler started");
        Ok(())
    }

    /// Halt dispatch; the process holding the CPU (if any) keeps it
    pub fn stop_scheduler(&self) -> KernelResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        let task = lifecycle.task.take().ok_or(KernelError::SchedulerStopped)?;

        self.inner.scheduler.set_dispatching(false);
        let ticks = lifecycle.clock.take().map(ClockTask::shutdown).unwrap_or(0);
        let dispatched = task.join();

        info!(dispatched, ticks, "Scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().task.is_some()
    }

    /// Stop dispatch, terminate every live process and reap all of them
    ///
    /// Returns the exit status of each reaped process, ordered by pid.
    pub fn shutdown(&self) -> Vec<(Pid, ExitStatus)> {
        match self.stop_scheduler() {
            Ok(()) | Err(KernelError::SchedulerStopped) => {}
            Err(e) => warn!(error = %e, "Scheduler stop failed during shutdown"),
        }

        for pid in self.inner.live_pids() {
            match self.terminate(pid) {
                Ok(()) | Err(KernelError::DoubleTerminate(_)) => {}
                Err(e) => warn!(%pid, error = %e, "Terminate failed during shutdown"),
            }
        }

        let me = self.current_pid();
        let reaped: Vec<(Pid, ExitStatus)> = self
            .inner
            .processes
            .all()
            .into_iter()
            .map(|p| p.pid())
            .filter(|&pid| Some(pid) != me)
            .filter_map(|pid| self.join(pid).ok().map(|status| (pid, status)))
            .collect();

        info!(reaped = reaped.len(), "Kernel shut down");
        reaped
    }

    /// Deliver `ticks` timer ticks
    pub fn tick(&self, ticks: Ticks) {
        self.inner.advance_clock(ticks);
    }

    /// Block until `pid` terminates, reap its thread and drop its PCB
    ///
    /// A process calling this keeps the CPU while it waits, so it must only
    /// join processes that can finish without being dispatched.
    pub fn join(&self, pid: Pid) -> KernelResult<ExitStatus> {
        if self.current_pid() == Some(pid) {
            return Err(KernelError::SelfJoin(pid));
        }

        let process = self.inner.processes.get(pid)?;
        let status = process.wait_exit();
        if let Some(handle) = process.take_thread() {
            if handle.join().is_err() {
                warn!(%pid, "Process thread panicked outside its entry");
            }
        }
        self.inner.processes.remove(pid);

        debug!(%pid, ?status, "Process joined");
        Ok(status)
    }

    pub fn state(&self, pid: Pid) -> KernelResult<ProcessState> {
        Ok(self.inner.processes.get(pid)?.state())
    }

    pub fn process_info(&self, pid: Pid) -> KernelResult<ProcessInfo> {
        Ok(self.inner.processes.get(pid)?.info())
    }

    /// Snapshot of every process still in the table, ordered by pid
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.inner.processes.all().iter().map(|p| p.info()).collect()
    }

    /// Process holding the CPU
    pub fn current(&self) -> Option<Pid> {
        self.inner.scheduler.lock_run().current
    }

    /// Ready queue of one class, head first
    pub fn ready_snapshot(&self, class: ProcessClass) -> Vec<Pid> {
        self.inner.scheduler.lock_run().ready.snapshot(class)
    }

    pub fn semaphore_count(&self, handle: SemaphoreHandle) -> KernelResult<i64> {
        Ok(self.inner.semaphores.get(handle)?.count())
    }

    /// Blocked pids of a semaphore, oldest first
    pub fn semaphore_waiters(&self, handle: SemaphoreHandle) -> KernelResult<Vec<Pid>> {
        Ok(self.inner.semaphores.get(handle)?.lock().waiters().collect())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.scheduler.stats()
    }

    /// Verify that every process's state agrees with its queue membership
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.inner.check_invariants()
    }

    /// Pid executed by the calling thread, if it is a process thread
    pub fn current_pid(&self) -> Option<Pid> {
        self.inner.processes.current_pid()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.inner.config)
            .field("processes", &self.inner.processes.len())
            .field("running", &self.is_running())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Body of every process thread
fn run_process<F>(process: Arc<Process>, ctx: ProcessContext, entry: F)
where
    F: FnOnce(ProcessContext) -> ProcessResult + Send + 'static,
{
    let kernel = ctx.kernel().clone();
    let pid = process.pid();
    let span = ProcessSpan::new(pid, process.name(), process.class());
    let _entered = span.enter();

    kernel.inner.processes.bind_current_thread(pid);

    // Killed before its first dispatch
    if kernel.inner.await_turn(&process).is_err() {
        kernel.inner.processes.unbind_current_thread();
        return;
    }

    let status = match panic::catch_unwind(AssertUnwindSafe(|| entry(ctx))) {
        Ok(Ok(())) => ExitStatus::Completed,
        Ok(Err(e)) => ExitStatus::Failed(e.to_string()),
        Err(payload) => ExitStatus::Panicked(panic_message(payload.as_ref())),
    };

    match kernel.inner.terminate_with(pid, status) {
        Ok(()) | Err(KernelError::DoubleTerminate(_)) => {}
        Err(e) => warn!(%pid, error = %e, "Process exit bookkeeping failed"),
    }
    kernel.inner.processes.unbind_current_thread();
}

/*!
 * Process Transitions
 *
 * Every state change lives here. Lock order:
 * counting semaphore -> run state -> delta queue -> gate -> PCB.
 * A transition that moves a process between structures holds the locks of
 * both, so no other actor can observe it in neither or in both.
 */

use super::KernelInner;
use crate::core::errors::{KernelError, KernelResult};
use crate::core::types::{Pid, ProcessClass, ProcessState, SemaphoreHandle, Ticks};
use crate::process::{ExitStatus, Process};
use crate::scheduler::{DelayReason, DispatchOutcome, Dispatcher, Expiry, RunState, TickSink};
use crate::sync::Acquire;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

impl KernelInner {
    /// Take `process` off the CPU and out of the ready and delta queues
    ///
    /// The gate is revoked only when the process held the CPU; a process
    /// already requeued by quantum expiry lost its turn at that point.
    fn detach(&self, run: &mut RunState, process: &Process) {
        let pid = process.pid();
        if run.current == Some(pid) {
            run.current = None;
            process.gate().revoke();
        }
        run.ready.remove(pid);
        self.scheduler.lock_delta().cancel(pid);
    }

    /// Insert a process at the tail of its class ready queue
    fn make_ready(&self, run: &mut RunState, process: &Process) {
        process.set_state(ProcessState::Ready);
        run.ready.requeue(process.class(), process.pid());
        self.scheduler.notify();
    }

    /// Publish a freshly spawned process: handle table and ready queue
    /// change together under the run lock
    pub(crate) fn admit(&self, process: Arc<Process>) {
        let mut run = self.scheduler.lock_run();
        self.processes.insert(Arc::clone(&process));
        self.make_ready(&mut run, &process);
    }

    /// Park until the process holds its turn
    pub(crate) fn await_turn(&self, process: &Process) -> KernelResult<()> {
        process
            .gate()
            .park()
            .map_err(|_| KernelError::Terminated(process.pid()))
    }

    pub(crate) fn checkpoint(&self, pid: Pid) -> KernelResult<()> {
        let process = self.processes.get(pid)?;
        self.await_turn(&process)
    }

    /// Semaphore wait on behalf of `pid`
    pub(crate) fn wait_as(&self, pid: Pid, handle: SemaphoreHandle) -> KernelResult<()> {
        let process = self.processes.get(pid)?;
        self.await_turn(&process)?;

        let sem = self.semaphores.get(handle)?;
        let mut sem_state = sem.lock();
        if sem_state.is_destroyed() {
            return Err(KernelError::invalid_semaphore(handle));
        }

        {
            // Termination is marked under the run lock; checking it here
            // keeps a dead process from taking a unit
            let mut run = self.scheduler.lock_run();
            if process.state().is_terminated() {
                return Err(KernelError::Terminated(pid));
            }
            if sem_state.acquire(pid) == Acquire::Proceed {
                return Ok(());
            }
            self.detach(&mut run, &process);
            process.block_on(handle);
            self.scheduler.notify();
        }
        drop(sem_state);

        self.scheduler.counters().inc_blocks();
        debug!(%pid, sem = %handle, "Process blocked");
        self.audit();

        self.await_turn(&process)?;
        if process.take_interrupted() {
            return Err(KernelError::invalid_semaphore(handle));
        }
        Ok(())
    }

    /// Semaphore signal; wakes the oldest waiter into its ready queue
    pub(crate) fn signal(&self, handle: SemaphoreHandle) -> KernelResult<()> {
        let sem = self.semaphores.get(handle)?;
        let mut sem_state = sem.lock();
        if sem_state.is_destroyed() {
            return Err(KernelError::invalid_semaphore(handle));
        }

        if let Some(waiter) = sem_state.release() {
            let mut run = self.scheduler.lock_run();
            match self.processes.get(waiter) {
                Ok(process) => self.make_ready(&mut run, &process),
                Err(_) => error!(pid = %waiter, sem = %handle, "Woke unknown process"),
            }
            drop(run);
            drop(sem_state);

            self.scheduler.counters().inc_wakeups();
            debug!(pid = %waiter, sem = %handle, "Process woken");
            self.audit();
        }

        Ok(())
    }

    /// Give up the CPU: sleep for `ticks`, or requeue at the tail when `None`
    pub(crate) fn relinquish(&self, pid: Pid, ticks: Option<Ticks>) -> KernelResult<()> {
        let process = self.processes.get(pid)?;
        self.await_turn(&process)?;

        {
            let mut run = self.scheduler.lock_run();
            if process.state().is_terminated() {
                return Err(KernelError::Terminated(pid));
            }
            self.detach(&mut run, &process);

            match ticks {
                Some(ticks) if ticks > 0 => {
                    process.set_state(ProcessState::Delayed);
                    self.scheduler
                        .lock_delta()
                        .schedule(pid, ticks, DelayReason::Sleep);
                    self.scheduler.counters().inc_sleeps();
                }
                _ => {
                    self.make_ready(&mut run, &process);
                    self.scheduler.counters().inc_yields();
                }
            }
            self.scheduler.notify();
        }

        self.audit();
        self.await_turn(&process)
    }

    /// Deliver timer ticks: expire quanta and sleeps
    pub(crate) fn advance_clock(&self, ticks: Ticks) {
        self.scheduler.counters().add_ticks(ticks);

        let mut run = self.scheduler.lock_run();
        let expired = self.scheduler.lock_delta().advance(ticks);
        if expired.is_empty() {
            return;
        }

        for Expiry { pid, reason } in expired {
            let process = match self.processes.get(pid) {
                Ok(process) => process,
                Err(_) => {
                    error!(%pid, "Expired unknown process");
                    continue;
                }
            };

            if reason == DelayReason::Quantum {
                if run.current == Some(pid) {
                    run.current = None;
                    process.gate().revoke();
                }
                process.set_state(ProcessState::Delayed);
                self.scheduler.counters().inc_quantum_expiries();
                trace!(%pid, "Quantum expired");
            }

            self.make_ready(&mut run, &process);
        }

        drop(run);
        self.audit();
    }

    /// Unlink a process from every structure and release its gate
    pub(crate) fn terminate_with(&self, pid: Pid, status: ExitStatus) -> KernelResult<()> {
        let process = self.processes.get(pid)?;

        loop {
            let blocked_on = process.blocked_on();
            let sem = blocked_on.and_then(|h| self.semaphores.get_any(h));
            let mut sem_state = sem.as_ref().map(|s| s.lock());
            let mut run = self.scheduler.lock_run();

            if process.state().is_terminated() {
                return Err(KernelError::DoubleTerminate(pid));
            }
            // Woken (or re-blocked elsewhere) between the read and the locks
            if process.blocked_on() != blocked_on {
                continue;
            }

            if let Some(state) = sem_state.as_mut() {
                state.withdraw(pid);
            }
            self.detach(&mut run, &process);
            run.ready.retire(process.class());
            process.mark_terminated(status.clone());
            self.scheduler.notify();
            break;
        }

        process.gate().close();
        self.semaphores.remove(process.gate().handle());
        self.scheduler.counters().inc_terminations();

        match &status {
            ExitStatus::Completed | ExitStatus::Killed => {
                info!(%pid, name = process.name(), ?status, "Process terminated")
            }
            ExitStatus::Failed(reason) | ExitStatus::Panicked(reason) => {
                warn!(%pid, name = process.name(), %reason, "Process failed")
            }
        }

        self.audit();
        Ok(())
    }

    /// Pids not yet terminated
    pub(crate) fn live_pids(&self) -> Vec<Pid> {
        self.processes
            .all()
            .into_iter()
            .filter(|p| !p.state().is_terminated())
            .map(|p| p.pid())
            .collect()
    }

    /// Destroy a counting semaphore; its waiters become ready and their
    /// `wait` fails with an invalid handle
    pub(crate) fn destroy_semaphore(&self, handle: SemaphoreHandle) -> KernelResult<()> {
        let sem = self.semaphores.get(handle)?;
        {
            let mut sem_state = sem.lock();
            if sem_state.is_destroyed() {
                return Err(KernelError::invalid_semaphore(handle));
            }

            let waiters = sem_state.destroy();
            let mut run = self.scheduler.lock_run();
            for pid in waiters {
                if let Ok(process) = self.processes.get(pid) {
                    process.interrupt();
                    run.ready.requeue(process.class(), pid);
                }
            }
            self.scheduler.notify();
        }

        self.semaphores.remove(handle);
        debug!(sem = %handle, "Semaphore destroyed");
        self.audit();
        Ok(())
    }
}

impl Dispatcher for KernelInner {
    fn dispatch_next(&self) -> DispatchOutcome {
        loop {
            let Some((mut run, class, pid)) = self.scheduler.select_next() else {
                return DispatchOutcome::Stopped;
            };

            let process = match self.processes.get(pid) {
                Ok(process) => process,
                Err(_) => {
                    error!(%pid, "Ready queue held unknown process");
                    run.current = None;
                    continue;
                }
            };

            process.set_state(ProcessState::Running);
            if class == ProcessClass::TimeSliced {
                self.scheduler
                    .lock_delta()
                    .schedule(pid, self.scheduler.quantum(), DelayReason::Quantum);
            }
            process.gate().grant();
            drop(run);

            self.scheduler.counters().inc_dispatches();
            trace!(%pid, %class, "Dispatched");
            self.audit();
            return DispatchOutcome::Dispatched(pid);
        }
    }
}

impl TickSink for KernelInner {
    fn tick(&self, ticks: Ticks) {
        self.advance_clock(ticks);
    }
}

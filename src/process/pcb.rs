/*!
 * Process Control Block
 *
 * Identity, class and state of one process plus the gate that decides when
 * its thread may run. State is only changed by kernel transitions while the
 * run lock is held, so it always agrees with queue membership.
 */

use super::types::{ExitStatus, ProcessInfo};
use crate::core::types::{Pid, ProcessClass, ProcessState, SemaphoreHandle};
use crate::sync::Semaphore;
use parking_lot::{Condvar, Mutex};
use smartstring::alias::String as SmartString;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

#[derive(Debug)]
struct ProcessInner {
    state: ProcessState,
    blocked_on: Option<SemaphoreHandle>,
    /// Woken because the semaphore it waited on was destroyed
    interrupted: bool,
    exit: Option<ExitStatus>,
    thread: Option<JoinHandle<()>>,
}

pub struct Process {
    pid: Pid,
    name: SmartString,
    class: ProcessClass,
    gate: Arc<Semaphore>,
    inner: Mutex<ProcessInner>,
    exited: Condvar,
}

impl Process {
    pub fn new(pid: Pid, name: &str, class: ProcessClass, gate: Arc<Semaphore>) -> Self {
        Self {
            pid,
            name: SmartString::from(name),
            class,
            gate,
            inner: Mutex::new(ProcessInner {
                state: ProcessState::Ready,
                blocked_on: None,
                interrupted: false,
                exit: None,
                thread: None,
            }),
            exited: Condvar::new(),
        }
    }

    #[inline(always)]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline(always)]
    pub fn class(&self) -> ProcessClass {
        self.class
    }

    /// Turn gate (also the handle released on termination)
    #[inline(always)]
    pub fn gate(&self) -> &Arc<Semaphore> {
        &self.gate
    }

    pub fn state(&self) -> ProcessState {
        self.inner.lock().state
    }

    pub fn blocked_on(&self) -> Option<SemaphoreHandle> {
        self.inner.lock().blocked_on
    }

    /// Move to `to`, returning the previous state
    pub fn set_state(&self, to: ProcessState) -> ProcessState {
        let mut inner = self.inner.lock();
        let from = inner.state;
        inner.state = to;
        if to != ProcessState::Blocked {
            inner.blocked_on = None;
        }
        drop(inner);

        debug!(pid = %self.pid, %from, %to, "Process state transition");
        from
    }

    /// Running -> Blocked on `sem`
    pub fn block_on(&self, sem: SemaphoreHandle) -> ProcessState {
        let from = self.set_state(ProcessState::Blocked);
        self.inner.lock().blocked_on = Some(sem);
        from
    }

    /// Blocked -> Ready because `blocked_on` was destroyed
    pub fn interrupt(&self) {
        self.set_state(ProcessState::Ready);
        self.inner.lock().interrupted = true;
    }

    pub fn take_interrupted(&self) -> bool {
        std::mem::take(&mut self.inner.lock().interrupted)
    }

    /// Enter the absorbing state and record how the process exited
    pub fn mark_terminated(&self, status: ExitStatus) {
        self.set_state(ProcessState::Terminated);
        let mut inner = self.inner.lock();
        inner.exit.get_or_insert(status);
        drop(inner);
        self.exited.notify_all();
    }

    /// Block until the process has terminated
    pub fn wait_exit(&self) -> ExitStatus {
        let mut inner = self.inner.lock();
        loop {
            if let Some(status) = inner.exit.clone() {
                return status;
            }
            self.exited.wait(&mut inner);
        }
    }

    pub fn set_thread(&self, handle: JoinHandle<()>) {
        self.inner.lock().thread = Some(handle);
    }

    pub fn take_thread(&self) -> Option<JoinHandle<()>> {
        self.inner.lock().thread.take()
    }

    pub fn info(&self) -> ProcessInfo {
        let inner = self.inner.lock();
        ProcessInfo {
            pid: self.pid,
            name: self.name.to_string(),
            class: self.class,
            state: inner.state,
            blocked_on: inner.blocked_on,
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name.as_str())
            .field("class", &self.class)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> Process {
        Process::new(
            Pid(1),
            "Producer",
            ProcessClass::TimeSliced,
            Arc::new(Semaphore::gate(SemaphoreHandle(1))),
        )
    }

    #[test]
    fn test_new_process_is_ready() {
        let p = process();
        assert_eq!(p.state(), ProcessState::Ready);
        assert_eq!(p.name(), "Producer");
        assert!(!p.gate().has_turn());
    }

    #[test]
    fn test_blocked_on_tracks_state() {
        let p = process();
        p.set_state(ProcessState::Running);
        p.block_on(SemaphoreHandle(4));
        assert_eq!(p.blocked_on(), Some(SemaphoreHandle(4)));

        p.set_state(ProcessState::Ready);
        assert_eq!(p.blocked_on(), None);
    }

    #[test]
    fn test_first_exit_status_wins() {
        let p = process();
        p.mark_terminated(ExitStatus::Killed);
        p.mark_terminated(ExitStatus::Completed);
        assert_eq!(p.wait_exit(), ExitStatus::Killed);
        assert_eq!(p.info().state, ProcessState::Terminated);
    }
}

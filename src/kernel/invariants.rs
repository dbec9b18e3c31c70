/*!
 * Invariant Audit
 *
 * Takes every structure lock (counting semaphores in handle order, then the
 * run state, then the delta queue) and checks that each process's state
 * agrees with where it is queued.
 */

use super::KernelInner;
use crate::core::types::{Pid, ProcessClass, ProcessState, SemaphoreHandle};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Ready(ProcessClass),
    Waiting(SemaphoreHandle),
    Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("process {pid} is queued in {count} structures")]
    MultipleMembership { pid: Pid, count: usize },

    #[error("process {pid} is {state} but {detail}")]
    StateMismatch {
        pid: Pid,
        state: ProcessState,
        detail: String,
    },

    #[error("semaphore {handle} has count {count} with {waiters} waiters")]
    SemaphoreBalance {
        handle: SemaphoreHandle,
        count: i64,
        waiters: usize,
    },

    #[error("unknown process {pid} found in {structure}")]
    UnknownProcess { pid: Pid, structure: &'static str },
}

impl KernelInner {
    pub(crate) fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let sems = self.semaphores.counting_sorted();
        let sem_states: Vec<_> = sems.iter().map(|s| (s.handle(), s.lock())).collect();
        let run = self.scheduler.lock_run();
        let delta = self.scheduler.lock_delta();

        let mut membership: HashMap<Pid, Vec<Location>> = HashMap::new();

        for class in ProcessClass::ALL {
            for pid in run.ready.snapshot(class) {
                membership.entry(pid).or_default().push(Location::Ready(class));
            }
        }

        for (handle, state) in &sem_states {
            let count = state.count();
            let waiters = state.waiter_count();
            let balanced = if count < 0 {
                waiters as i64 == -count
            } else {
                waiters == 0
            };
            if !balanced {
                return Err(InvariantViolation::SemaphoreBalance {
                    handle: *handle,
                    count,
                    waiters,
                });
            }
            for pid in state.waiters() {
                membership.entry(pid).or_default().push(Location::Waiting(*handle));
            }
        }

        for pid in delta.pids() {
            membership.entry(pid).or_default().push(Location::Delta);
        }

        for (pid, locations) in &membership {
            if locations.len() > 1 {
                return Err(InvariantViolation::MultipleMembership {
                    pid: *pid,
                    count: locations.len(),
                });
            }
            if self.processes.get(*pid).is_err() {
                return Err(InvariantViolation::UnknownProcess {
                    pid: *pid,
                    structure: "queues",
                });
            }
        }

        if let Some(pid) = run.current {
            if self.processes.get(pid).is_err() {
                return Err(InvariantViolation::UnknownProcess {
                    pid,
                    structure: "cpu",
                });
            }
        }

        for process in self.processes.all() {
            let pid = process.pid();
            let state = process.state();
            let locations = membership.get(&pid).map(Vec::as_slice).unwrap_or(&[]);
            let on_cpu = run.current == Some(pid);

            let placed = match state {
                ProcessState::Ready => {
                    !on_cpu && matches!(locations, [Location::Ready(c)] if *c == process.class())
                }
                ProcessState::Running => {
                    on_cpu && (locations.is_empty() || matches!(locations, [Location::Delta]))
                }
                ProcessState::Blocked => {
                    !on_cpu
                        && matches!(locations, [Location::Waiting(h)] if Some(*h) == process.blocked_on())
                }
                ProcessState::Delayed => !on_cpu && matches!(locations, [Location::Delta]),
                ProcessState::Terminated => !on_cpu && locations.is_empty(),
            };

            if !placed {
                return Err(InvariantViolation::StateMismatch {
                    pid,
                    state,
                    detail: format!("is located in {:?} (on cpu: {})", locations, on_cpu),
                });
            }

            if !state.is_terminated() && process.gate().has_turn() != (state == ProcessState::Running) {
                return Err(InvariantViolation::StateMismatch {
                    pid,
                    state,
                    detail: "its gate disagrees about holding the turn".into(),
                });
            }
        }

        Ok(())
    }

    /// Post-transition audit (enabled by config or the `strict_invariants` feature)
    pub(crate) fn audit(&self) {
        if !(self.config.check_invariants || cfg!(feature = "strict_invariants")) {
            return;
        }
        if let Err(violation) = self.check_invariants() {
            self.scheduler.counters().inc_invariant_violations();
            error!(%violation, "Kernel invariant violated");
        }
    }
}

/*!
 * Counting Semaphore
 *
 * Monitor-style semaphore: the count and the FIFO wait queue live behind one
 * mutex so examining the count and enqueuing a waiter is a single step.
 *
 * # Gates
 *
 * Every process also owns a private gate semaphore. A gate never holds pids in
 * its wait queue; instead its count tracks the owner's turn to run:
 * spawn starts it at -1, each dispatch adds one, each revocation (block,
 * quantum expiry, sleep, yield) subtracts one. The owner thread runs while
 * the count is non-negative and parks on the condvar otherwise.
 */

use crate::core::types::{Pid, SemaphoreHandle};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;

/// Role of a semaphore in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemaphoreKind {
    /// Created through `create_semaphore`; visible to processes
    Counting,
    /// Private turn gate of one process
    Gate,
}

/// Outcome of a wait request against the count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Count stayed non-negative; caller continues
    Proceed,
    /// Count went negative; caller was queued and must block
    Blocked,
}

/// Gate park failure: the gate was closed while (or before) parking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateClosed;

/// Mutable semaphore state (always accessed under the semaphore mutex)
#[derive(Debug)]
pub struct SemState {
    count: i64,
    waiters: VecDeque<Pid>,
    destroyed: bool,
}

impl SemState {
    fn new(initial: i64) -> Self {
        Self {
            count: initial,
            waiters: VecDeque::new(),
            destroyed: false,
        }
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.count
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[inline]
    pub fn waiters(&self) -> impl Iterator<Item = Pid> + '_ {
        self.waiters.iter().copied()
    }

    #[inline]
    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    /// Decrement; queue `pid` exactly when the count goes negative
    pub fn acquire(&mut self, pid: Pid) -> Acquire {
        self.count -= 1;
        if self.count < 0 {
            self.waiters.push_back(pid);
            Acquire::Blocked
        } else {
            Acquire::Proceed
        }
    }

    /// Increment and hand back the oldest waiter, if any
    pub fn release(&mut self) -> Option<Pid> {
        self.count += 1;
        self.waiters.pop_front()
    }

    /// Withdraw a queued wait request (waiter terminated)
    ///
    /// Returns false if `pid` was not queued.
    pub fn withdraw(&mut self, pid: Pid) -> bool {
        match self.waiters.iter().position(|&w| w == pid) {
            Some(pos) => {
                self.waiters.remove(pos);
                self.count += 1;
                true
            }
            None => false,
        }
    }

    /// Mark destroyed and hand back every waiter in FIFO order
    pub fn destroy(&mut self) -> Vec<Pid> {
        self.destroyed = true;
        let drained: Vec<Pid> = self.waiters.drain(..).collect();
        self.count += drained.len() as i64;
        drained
    }
}

/// Counting semaphore with FIFO waiters
pub struct Semaphore {
    handle: SemaphoreHandle,
    kind: SemaphoreKind,
    state: Mutex<SemState>,
    turn: Condvar,
}

impl Semaphore {
    pub fn new(handle: SemaphoreHandle, kind: SemaphoreKind, initial: i64) -> Self {
        Self {
            handle,
            kind,
            state: Mutex::new(SemState::new(initial)),
            turn: Condvar::new(),
        }
    }

    /// Gate for a freshly spawned process (not yet dispatched)
    pub fn gate(handle: SemaphoreHandle) -> Self {
        Self::new(handle, SemaphoreKind::Gate, -1)
    }

    #[inline(always)]
    pub fn handle(&self) -> SemaphoreHandle {
        self.handle
    }

    #[inline(always)]
    pub fn kind(&self) -> SemaphoreKind {
        self.kind
    }

    /// Enter the semaphore's exclusive section
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, SemState> {
        self.state.lock()
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.state.lock().count
    }

    /// Hand the owner its turn
    pub fn grant(&self) {
        let mut state = self.state.lock();
        state.count += 1;
        if state.count >= 0 {
            self.turn.notify_all();
        }
    }

    /// Take the owner's turn away (it parks at its next preemption point)
    pub fn revoke(&self) {
        self.state.lock().count -= 1;
    }

    /// Whether the owner currently holds its turn
    pub fn has_turn(&self) -> bool {
        let state = self.state.lock();
        !state.destroyed && state.count >= 0
    }

    /// Block the calling thread until the owner holds its turn
    pub fn park(&self) -> Result<(), GateClosed> {
        let mut state = self.state.lock();
        while !state.destroyed && state.count < 0 {
            self.turn.wait(&mut state);
        }
        if state.destroyed {
            Err(GateClosed)
        } else {
            Ok(())
        }
    }

    /// Close the gate, releasing any parked owner with `GateClosed`
    pub fn close(&self) {
        self.state.lock().destroyed = true;
        self.turn.notify_all();
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Semaphore")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("count", &state.count)
            .field("waiters", &state.waiters)
            .finish()
    }
}

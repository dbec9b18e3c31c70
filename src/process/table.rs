/*!
 * Process Table
 *
 * Handle table mapping pids to PCBs, plus the explicit mapping from host
 * thread identity to pid used by operations that act on "the caller".
 */

use super::pcb::Process;
use crate::core::errors::{KernelError, KernelResult};
use crate::core::types::Pid;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

pub struct ProcessTable {
    processes: DashMap<Pid, Arc<Process>, RandomState>,
    threads: DashMap<ThreadId, Pid, RandomState>,
    next_pid: AtomicU32,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            processes: DashMap::with_hasher(RandomState::new()),
            threads: DashMap::with_hasher(RandomState::new()),
            next_pid: AtomicU32::new(1),
        }
    }

    pub fn next_pid(&self) -> Pid {
        Pid(self.next_pid.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, process: Arc<Process>) {
        self.processes.insert(process.pid(), process);
    }

    pub fn get(&self, pid: Pid) -> KernelResult<Arc<Process>> {
        self.processes
            .get(&pid)
            .map(|p| Arc::clone(p.value()))
            .ok_or(KernelError::invalid_process(pid))
    }

    pub fn remove(&self, pid: Pid) -> Option<Arc<Process>> {
        self.processes.remove(&pid).map(|(_, p)| p)
    }

    /// Record that the calling thread executes `pid`
    pub fn bind_current_thread(&self, pid: Pid) {
        self.threads.insert(thread::current().id(), pid);
    }

    pub fn unbind_current_thread(&self) {
        self.threads.remove(&thread::current().id());
    }

    /// Pid executed by the calling thread
    pub fn current_pid(&self) -> Option<Pid> {
        self.threads.get(&thread::current().id()).map(|p| *p.value())
    }

    /// All PCBs ordered by pid
    pub fn all(&self) -> Vec<Arc<Process>> {
        let mut all: Vec<Arc<Process>> =
            self.processes.iter().map(|p| Arc::clone(p.value())).collect();
        all.sort_by_key(|p| p.pid());
        all
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

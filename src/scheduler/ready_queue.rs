/*!
 * Ready Queues
 * Per-class FIFO queues consulted with strict priority RT > TS
 */

use crate::core::errors::{KernelError, KernelResult};
use crate::core::types::{Pid, ProcessClass};
use std::collections::VecDeque;

/// Two FIFO queues, one per class
///
/// Ordering within a class is strictly FIFO. Any intra-class priority
/// ordering would replace `VecDeque::push_back` in `requeue`.
#[derive(Debug)]
pub struct ReadyQueue {
    queues: [VecDeque<Pid>; 2],
    capacity: Option<usize>,
    admitted: [usize; 2],
}

impl ReadyQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            queues: [VecDeque::new(), VecDeque::new()],
            capacity,
            admitted: [0, 0],
        }
    }

    /// Unbounded ready queue
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Reserve a slot for a new process of `class`
    ///
    /// With a bounded arena this caps live processes per class, so every
    /// later `requeue` of an admitted process always fits.
    pub fn admit(&mut self, class: ProcessClass) -> KernelResult<()> {
        let idx = class.index();
        if let Some(cap) = self.capacity {
            if self.admitted[idx] >= cap {
                return Err(KernelError::QueueFull(cap));
            }
        }
        self.admitted[idx] += 1;
        Ok(())
    }

    /// Release the slot of a terminated process
    pub fn retire(&mut self, class: ProcessClass) {
        let idx = class.index();
        self.admitted[idx] = self.admitted[idx].saturating_sub(1);
    }

    /// Append an admitted process to the tail of its class queue
    ///
    /// Capacity is enforced once, by `admit`; a queue never holds more
    /// pids than its class has live admissions.
    pub fn requeue(&mut self, class: ProcessClass, pid: Pid) {
        self.queues[class.index()].push_back(pid);
    }

    /// RT head if any, else TS head, else nothing
    pub fn dequeue_next(&mut self) -> Option<(ProcessClass, Pid)> {
        ProcessClass::ALL
            .iter()
            .find_map(|&class| self.queues[class.index()].pop_front().map(|pid| (class, pid)))
    }

    /// Remove `pid` from whichever queue holds it
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessClass> {
        for class in ProcessClass::ALL {
            let queue = &mut self.queues[class.index()];
            if let Some(pos) = queue.iter().position(|&p| p == pid) {
                queue.remove(pos);
                return Some(class);
            }
        }
        None
    }

    /// Queued pids of one class, head first
    pub fn snapshot(&self, class: ProcessClass) -> Vec<Pid> {
        self.queues[class.index()].iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

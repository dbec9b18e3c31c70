/*!
 * Delta Queue
 *
 * Time-ordered list of delayed processes. Only the head stores an absolute
 * remaining duration; every later entry stores its delay relative to its
 * predecessor, so a tick touches only the head.
 */

use crate::core::types::{Pid, Ticks};
use std::collections::VecDeque;

/// Why a process sits in the delta queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayReason {
    /// Running time-sliced process; fires when its quantum is spent
    Quantum,
    /// Process asked to sleep
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeltaEntry {
    pid: Pid,
    delta: Ticks,
    reason: DelayReason,
}

/// An expired delta queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub pid: Pid,
    pub reason: DelayReason,
}

#[derive(Debug, Default)]
pub struct DeltaQueue {
    entries: VecDeque<DeltaEntry>,
}

impl DeltaQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `pid` to expire `ticks` from now
    ///
    /// Entries with equal expiry keep insertion order.
    pub fn schedule(&mut self, pid: Pid, ticks: Ticks, reason: DelayReason) {
        let mut remaining = ticks;
        let mut pos = 0;

        while let Some(entry) = self.entries.get(pos) {
            if remaining < entry.delta {
                break;
            }
            remaining -= entry.delta;
            pos += 1;
        }

        if let Some(next) = self.entries.get_mut(pos) {
            next.delta -= remaining;
        }

        self.entries.insert(
            pos,
            DeltaEntry {
                pid,
                delta: remaining,
                reason,
            },
        );
    }

    /// Advance the clock, returning expired entries in expiry order
    pub fn advance(&mut self, elapsed: Ticks) -> Vec<Expiry> {
        let mut residual = elapsed;
        let mut fired = Vec::new();

        while let Some(head) = self.entries.front_mut() {
            if head.delta > residual {
                head.delta -= residual;
                break;
            }
            residual -= head.delta;
            if let Some(entry) = self.entries.pop_front() {
                fired.push(Expiry {
                    pid: entry.pid,
                    reason: entry.reason,
                });
            }
        }

        fired
    }

    /// Remove `pid` out of order, folding its delta into its successor
    pub fn cancel(&mut self, pid: Pid) -> Option<DelayReason> {
        let pos = self.entries.iter().position(|e| e.pid == pid)?;
        let entry = self.entries.remove(pos)?;
        if let Some(next) = self.entries.get_mut(pos) {
            next.delta += entry.delta;
        }
        Some(entry.reason)
    }

    /// Ticks until the head expires
    pub fn head_remaining(&self) -> Option<Ticks> {
        self.entries.front().map(|e| e.delta)
    }

    /// (pid, absolute ticks until expiry) pairs, soonest first
    pub fn absolute(&self) -> Vec<(Pid, Ticks)> {
        let mut acc = 0;
        self.entries
            .iter()
            .map(|e| {
                acc += e.delta;
                (e.pid, acc)
            })
            .collect()
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.iter().map(|e| e.pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pids(fired: Vec<Expiry>) -> Vec<Pid> {
        fired.into_iter().map(|e| e.pid).collect()
    }

    #[test]
    fn test_relative_encoding() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(5), 5, DelayReason::Sleep);
        dq.schedule(Pid(3), 3, DelayReason::Sleep);
        dq.schedule(Pid(2), 2, DelayReason::Sleep);

        assert_eq!(dq.head_remaining(), Some(2));
        assert_eq!(
            dq.absolute(),
            vec![(Pid(2), 2), (Pid(3), 3), (Pid(5), 5)]
        );
    }

    #[test]
    fn test_fires_in_ascending_order() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(5), 5, DelayReason::Sleep);
        dq.schedule(Pid(3), 3, DelayReason::Sleep);
        dq.schedule(Pid(2), 2, DelayReason::Sleep);

        let mut order = Vec::new();
        for tick in 1..=6 {
            for pid in pids(dq.advance(1)) {
                order.push((pid, tick));
            }
        }

        assert_eq!(order, vec![(Pid(2), 2), (Pid(3), 3), (Pid(5), 5)]);
        assert!(dq.is_empty());
    }

    #[test]
    fn test_advance_applies_residual() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(1), 2, DelayReason::Quantum);
        dq.schedule(Pid(2), 4, DelayReason::Quantum);
        dq.schedule(Pid(3), 9, DelayReason::Quantum);

        assert_eq!(pids(dq.advance(5)), vec![Pid(1), Pid(2)]);
        assert_eq!(dq.absolute(), vec![(Pid(3), 4)]);
    }

    #[test]
    fn test_equal_expiry_keeps_insertion_order() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(1), 3, DelayReason::Sleep);
        dq.schedule(Pid(2), 3, DelayReason::Sleep);

        assert_eq!(pids(dq.advance(3)), vec![Pid(1), Pid(2)]);
    }

    #[test]
    fn test_cancel_folds_delta() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(1), 2, DelayReason::Sleep);
        dq.schedule(Pid(2), 5, DelayReason::Quantum);
        dq.schedule(Pid(3), 7, DelayReason::Sleep);

        assert_eq!(dq.cancel(Pid(2)), Some(DelayReason::Quantum));
        assert_eq!(dq.absolute(), vec![(Pid(1), 2), (Pid(3), 7)]);

        assert_eq!(dq.cancel(Pid(1)), Some(DelayReason::Sleep));
        assert_eq!(dq.absolute(), vec![(Pid(3), 7)]);

        assert_eq!(dq.cancel(Pid(9)), None);
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut dq = DeltaQueue::new();
        dq.schedule(Pid(1), 0, DelayReason::Sleep);
        assert_eq!(pids(dq.advance(0)), vec![Pid(1)]);
    }
}

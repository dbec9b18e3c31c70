/*!
 * Lock-Free Scheduler Statistics
 * Uses atomic counters for zero-contention stats tracking in hot dispatch paths
 */

use crate::core::types::Ticks;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub dispatches: u64,
    pub quantum_expiries: u64,
    pub blocks: u64,
    pub wakeups: u64,
    pub sleeps: u64,
    pub yields: u64,
    pub terminations: u64,
    pub invariant_violations: u64,
    pub ticks: Ticks,
    pub quantum_ticks: Ticks,
}

/// Atomic scheduler statistics for lock-free updates
///
/// # Note
/// Counter values may not be perfectly consistent with each other due to
/// concurrent updates, but each individual value is accurate.
#[repr(C, align(64))]
pub struct AtomicSchedulerStats {
    dispatches: AtomicU64,
    quantum_expiries: AtomicU64,
    blocks: AtomicU64,
    wakeups: AtomicU64,
    sleeps: AtomicU64,
    yields: AtomicU64,
    terminations: AtomicU64,
    invariant_violations: AtomicU64,
    ticks: AtomicU64,
    quantum_ticks: Ticks,
}

impl AtomicSchedulerStats {
    pub fn new(quantum_ticks: Ticks) -> Self {
        Self {
            dispatches: AtomicU64::new(0),
            quantum_expiries: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            wakeups: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
            yields: AtomicU64::new(0),
            terminations: AtomicU64::new(0),
            invariant_violations: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            quantum_ticks,
        }
    }

    #[inline(always)]
    pub fn inc_dispatches(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_quantum_expiries(&self) {
        self.quantum_expiries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_blocks(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_wakeups(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_sleeps(&self) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_yields(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_terminations(&self) {
        self.terminations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_invariant_violations(&self) {
        self.invariant_violations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn add_ticks(&self, ticks: Ticks) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            quantum_expiries: self.quantum_expiries.load(Ordering::Relaxed),
            blocks: self.blocks.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            sleeps: self.sleeps.load(Ordering::Relaxed),
            yields: self.yields.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
            invariant_violations: self.invariant_violations.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            quantum_ticks: self.quantum_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = AtomicSchedulerStats::new(4);
        stats.inc_dispatches();
        stats.inc_dispatches();
        stats.inc_blocks();
        stats.add_ticks(10);

        let snap = stats.snapshot();
        assert_eq!(snap.dispatches, 2);
        assert_eq!(snap.blocks, 1);
        assert_eq!(snap.ticks, 10);
        assert_eq!(snap.quantum_ticks, 4);
        assert_eq!(snap.wakeups, 0);
    }
}

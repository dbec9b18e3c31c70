/*!
 * Semaphore Arena
 * Growable handle table; handles are never reused
 */

use super::semaphore::{Semaphore, SemaphoreKind};
use crate::core::errors::{KernelError, KernelResult};
use crate::core::types::SemaphoreHandle;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub struct SemaphoreTable {
    entries: DashMap<SemaphoreHandle, Arc<Semaphore>, RandomState>,
    next_id: AtomicU32,
}

impl SemaphoreTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            next_id: AtomicU32::new(1),
        }
    }

    fn allocate(&self, build: impl FnOnce(SemaphoreHandle) -> Semaphore) -> Arc<Semaphore> {
        let handle = SemaphoreHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sem = Arc::new(build(handle));
        self.entries.insert(handle, Arc::clone(&sem));
        sem
    }

    /// Create a counting semaphore
    pub fn create(&self, initial: u32) -> Arc<Semaphore> {
        self.allocate(|h| Semaphore::new(h, SemaphoreKind::Counting, i64::from(initial)))
    }

    /// Create a process gate
    pub fn create_gate(&self) -> Arc<Semaphore> {
        self.allocate(Semaphore::gate)
    }

    /// Look up a process-visible semaphore
    ///
    /// Gates are private to their owner and resolve as invalid handles.
    pub fn get(&self, handle: SemaphoreHandle) -> KernelResult<Arc<Semaphore>> {
        match self.entries.get(&handle) {
            Some(entry) if entry.kind() == SemaphoreKind::Counting => Ok(Arc::clone(entry.value())),
            _ => Err(KernelError::invalid_semaphore(handle)),
        }
    }

    /// Look up any semaphore, gates included
    pub fn get_any(&self, handle: SemaphoreHandle) -> Option<Arc<Semaphore>> {
        self.entries.get(&handle).map(|e| Arc::clone(e.value()))
    }

    pub fn remove(&self, handle: SemaphoreHandle) -> Option<Arc<Semaphore>> {
        self.entries.remove(&handle).map(|(_, sem)| sem)
    }

    /// Counting semaphores ordered by handle (the audit lock order)
    pub fn counting_sorted(&self) -> Vec<Arc<Semaphore>> {
        let mut sems: Vec<Arc<Semaphore>> = self
            .entries
            .iter()
            .filter(|e| e.kind() == SemaphoreKind::Counting)
            .map(|e| Arc::clone(e.value()))
            .collect();
        sems.sort_by_key(|s| s.handle());
        sems
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SemaphoreTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let table = SemaphoreTable::new();
        let a = table.create(0).handle();
        let b = table.create(1).handle();
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_gates_are_private() {
        let table = SemaphoreTable::new();
        let gate = table.create_gate().handle();

        assert_eq!(
            table.get(gate).unwrap_err(),
            KernelError::invalid_semaphore(gate)
        );
        assert!(table.get_any(gate).is_some());
        assert!(table.counting_sorted().is_empty());
    }

    #[test]
    fn test_removed_handle_is_invalid() {
        let table = SemaphoreTable::new();
        let handle = table.create(3).handle();
        assert_eq!(table.get(handle).unwrap().count(), 3);

        table.remove(handle);
        assert!(table.get(handle).is_err());
    }
}

/*!
 * Process Context
 * Handle given to a process entry for issuing kernel operations as itself
 */

use super::Kernel;
use crate::core::errors::KernelResult;
use crate::core::types::{Pid, ProcessState, SemaphoreHandle, Ticks};

/// The running process's view of the kernel
///
/// Cloning is cheap; every clone acts as the same process.
#[derive(Clone)]
pub struct ProcessContext {
    kernel: Kernel,
    pid: Pid,
}

impl ProcessContext {
    pub(crate) fn new(kernel: Kernel, pid: Pid) -> Self {
        Self { kernel, pid }
    }

    #[inline(always)]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> KernelResult<String> {
        Ok(self.kernel.process_info(self.pid)?.name)
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn state(&self) -> KernelResult<ProcessState> {
        self.kernel.state(self.pid)
    }

    /// Decrement `sem`; blocks (and gives up the CPU) if it goes negative
    pub fn wait(&self, sem: SemaphoreHandle) -> KernelResult<()> {
        self.kernel.inner.wait_as(self.pid, sem)
    }

    /// Increment `sem`, waking its oldest waiter. Never blocks.
    pub fn signal(&self, sem: SemaphoreHandle) -> KernelResult<()> {
        self.kernel.inner.signal(sem)
    }

    /// Go to the tail of the class ready queue
    pub fn yield_now(&self) -> KernelResult<()> {
        self.kernel.inner.relinquish(self.pid, None)
    }

    /// Leave the CPU for `ticks` timer ticks (`0` yields)
    pub fn sleep(&self, ticks: Ticks) -> KernelResult<()> {
        self.kernel.inner.relinquish(self.pid, Some(ticks))
    }

    /// Preemption point: parks if the quantum expired since the last one
    pub fn checkpoint(&self) -> KernelResult<()> {
        self.kernel.inner.checkpoint(self.pid)
    }
}

impl std::fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext").field("pid", &self.pid).finish()
    }
}

/*!
 * Scheduler Traits
 * Seams between the dispatch/timer threads and the kernel they drive
 */

use crate::core::types::{Pid, Ticks};

/// Result of one dispatch decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The process now holds the CPU
    Dispatched(Pid),
    /// `stop_scheduler` was called
    Stopped,
}

/// One iteration of the dispatch loop
pub trait Dispatcher: Send + Sync + 'static {
    /// Block until a process can be dispatched (or dispatch is stopped),
    /// then hand it the CPU
    fn dispatch_next(&self) -> DispatchOutcome;
}

/// Receiver of timer ticks
pub trait TickSink: Send + Sync + 'static {
    fn tick(&self, ticks: Ticks);
}

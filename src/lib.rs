/*!
 * RTK - Real-Time Dispatch Kernel
 * Process dispatch, counting semaphores and time slicing exposed as a library
 */

pub mod core;
pub mod demo;
pub mod kernel;
pub mod monitoring;
pub mod process;
pub mod scheduler;
pub mod sync;

// Re-exports
pub use crate::core::{
    ClockMode, HandleKind, KernelConfig, KernelError, KernelResult, Pid, ProcessClass,
    ProcessState, SemaphoreHandle, Ticks,
};
pub use demo::{copy_file, CopyReport};
pub use kernel::{InvariantViolation, Kernel, ProcessContext};
pub use monitoring::init_tracing;
pub use process::{ExitStatus, ProcessFailure, ProcessInfo, ProcessResult};
pub use scheduler::SchedulerStats;

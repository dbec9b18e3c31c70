/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{Pid, SemaphoreHandle};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Kind of handle an operation dereferenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Process,
    Semaphore,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Semaphore => f.write_str("semaphore"),
        }
    }
}

/// Kernel errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum KernelError {
    #[error("Invalid {0} handle {1}")]
    #[diagnostic(
        code(kernel::invalid_handle),
        help("The handle was destroyed or never existed.")
    )]
    InvalidHandle(HandleKind, u32),

    #[error("Ready queue full (capacity {0})")]
    #[diagnostic(
        code(kernel::queue_full),
        help("The kernel was configured with a bounded ready queue. Terminate processes or raise RTK_READY_CAPACITY.")
    )]
    QueueFull(usize),

    #[error("Process {0} already terminated")]
    #[diagnostic(code(kernel::double_terminate))]
    DoubleTerminate(Pid),

    #[error("Process {0} was terminated")]
    #[diagnostic(
        code(kernel::terminated),
        help("The calling process was terminated and must unwind.")
    )]
    Terminated(Pid),

    #[error("Calling thread is not a kernel process")]
    #[diagnostic(
        code(kernel::not_a_process),
        help("Blocking operations must be issued from inside a spawned process.")
    )]
    NotAProcess,

    #[error("Process {0} cannot join itself")]
    #[diagnostic(code(kernel::self_join))]
    SelfJoin(Pid),

    #[error("Scheduler already running")]
    #[diagnostic(code(scheduler::already_running))]
    SchedulerRunning,

    #[error("Scheduler not running")]
    #[diagnostic(code(scheduler::not_running))]
    SchedulerStopped,

    #[error("Failed to spawn process: {0}")]
    #[diagnostic(
        code(kernel::spawn_failed),
        help("The host could not create an execution context. Check thread limits.")
    )]
    SpawnFailed(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(kernel::invalid_config))]
    InvalidConfig(String),
}

impl KernelError {
    #[inline]
    pub const fn invalid_process(pid: Pid) -> Self {
        Self::InvalidHandle(HandleKind::Process, pid.0)
    }

    #[inline]
    pub const fn invalid_semaphore(handle: SemaphoreHandle) -> Self {
        Self::InvalidHandle(HandleKind::Semaphore, handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KernelError::invalid_semaphore(SemaphoreHandle(7));
        assert_eq!(err.to_string(), "Invalid semaphore handle 7");

        let err = KernelError::DoubleTerminate(Pid(3));
        assert_eq!(err.to_string(), "Process 3 already terminated");
    }

    #[test]
    fn test_error_serialization() {
        let err = KernelError::invalid_process(Pid(4));
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"error_type":"invalid_handle","details":["process",4]}"#
        );

        let back: KernelError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}

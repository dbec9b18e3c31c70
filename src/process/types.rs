/*!
 * Process Types
 * Common types for process management
 */

use crate::core::types::{Pid, ProcessClass, ProcessState, SemaphoreHandle};
use serde::{Deserialize, Serialize};

/// Error a process entry may return
pub type ProcessFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a process entry
pub type ProcessResult = Result<(), ProcessFailure>;

/// How a process left the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Entry returned `Ok`
    Completed,
    /// Entry returned an error
    Failed(String),
    /// Entry panicked
    Panicked(String),
    /// Terminated through `Kernel::terminate`
    Killed,
}

impl ExitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Process metadata snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub class: ProcessClass,
    pub state: ProcessState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_on: Option<SemaphoreHandle>,
}

/*!
 * Core Types
 * Handles, classes and states shared across the kernel
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timer ticks (the unit of the delta queue and of quanta)
pub type Ticks = u64;

/// Process handle (stable for the lifetime of the kernel, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

/// Semaphore handle (stable for the lifetime of the kernel, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemaphoreHandle(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SemaphoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sem{}", self.0)
    }
}

/// Dispatch class of a process
///
/// Real-time processes are always dispatched before time-sliced ones and run
/// until they block or finish. Time-sliced processes receive a fixed quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessClass {
    RealTime,
    TimeSliced,
}

impl ProcessClass {
    /// All classes in dispatch priority order
    pub const ALL: [ProcessClass; 2] = [ProcessClass::RealTime, ProcessClass::TimeSliced];

    /// Queue index (0 = highest priority)
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Self::RealTime => 0,
            Self::TimeSliced => 1,
        }
    }

    #[inline(always)]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RealTime => "real_time",
            Self::TimeSliced => "time_sliced",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "real_time" | "realtime" | "rt" | "rtp" => Some(Self::RealTime),
            "time_sliced" | "timesliced" | "ts" | "tcp" => Some(Self::TimeSliced),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// In its class ready queue
    Ready,
    /// Holds the CPU
    Running,
    /// In exactly one semaphore wait queue
    Blocked,
    /// In the delta queue, not holding the CPU
    Delayed,
    /// Unlinked from every structure (absorbing)
    Terminated,
}

impl ProcessState {
    #[inline(always)]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Blocked => "blocked",
            Self::Delayed => "delayed",
            Self::Terminated => "terminated",
        }
    }

    #[inline(always)]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

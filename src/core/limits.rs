/*!
 * System Limits and Constants
 *
 * Centralized location for kernel-wide defaults and thread naming.
 */

use super::types::Ticks;
use std::time::Duration;

// =============================================================================
// TIME SLICING
// =============================================================================

/// Default quantum granted to a time-sliced process
pub const DEFAULT_QUANTUM_TICKS: Ticks = 5;

/// Default software timer period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted timer period
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// THREAD NAMING
// =============================================================================

/// Name of the dispatch loop thread
pub const SCHEDULER_THREAD_NAME: &str = "rtk-scheduler";

/// Name of the software timer thread
pub const CLOCK_THREAD_NAME: &str = "rtk-clock";

/// Prefix for process threads (followed by the pid)
pub const PROCESS_THREAD_PREFIX: &str = "rtk-proc";

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_QUANTUM_TICKS: &str = "RTK_QUANTUM_TICKS";
pub const ENV_TICK_MICROS: &str = "RTK_TICK_MICROS";
pub const ENV_READY_CAPACITY: &str = "RTK_READY_CAPACITY";
pub const ENV_CHECK_INVARIANTS: &str = "RTK_CHECK_INVARIANTS";
pub const ENV_TRACE_JSON: &str = "RTK_TRACE_JSON";

/*!
 * Kernel Configuration
 *
 * Runtime configuration for time slicing, the software clock and admission
 */

use super::errors::{KernelError, KernelResult};
use super::limits::{
    DEFAULT_QUANTUM_TICKS, DEFAULT_TICK_INTERVAL, ENV_CHECK_INVARIANTS, ENV_QUANTUM_TICKS,
    ENV_READY_CAPACITY, ENV_TICK_MICROS, MAX_TICK_INTERVAL,
};
use super::types::Ticks;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of timer ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Ticks are delivered only through `Kernel::tick`
    Manual,
    /// A timer thread delivers one tick per interval
    Interval(Duration),
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Ticks a time-sliced process may run before it is requeued
    pub quantum_ticks: Ticks,
    /// Tick source
    pub clock: ClockMode,
    /// Maximum live processes per class (`None` = unbounded)
    pub ready_capacity: Option<usize>,
    /// Audit queue/state invariants after every transition
    pub check_invariants: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            quantum_ticks: DEFAULT_QUANTUM_TICKS,
            clock: ClockMode::Interval(DEFAULT_TICK_INTERVAL),
            ready_capacity: None,
            check_invariants: false,
        }
    }
}

impl KernelConfig {
    /// Configuration driven by explicit `Kernel::tick` calls (deterministic tests)
    pub fn manual() -> Self {
        Self {
            clock: ClockMode::Manual,
            check_invariants: true,
            ..Default::default()
        }
    }

    pub fn with_quantum_ticks(mut self, ticks: Ticks) -> Self {
        self.quantum_ticks = ticks;
        self
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ready_capacity(mut self, capacity: usize) -> Self {
        self.ready_capacity = Some(capacity);
        self
    }

    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    /// Build configuration from the process environment
    ///
    /// Environment variables:
    /// - RTK_QUANTUM_TICKS: quantum in ticks (default: 5)
    /// - RTK_TICK_MICROS: timer period in microseconds, 0 for manual (default: 1000)
    /// - RTK_READY_CAPACITY: per-class process limit (default: unbounded)
    /// - RTK_CHECK_INVARIANTS: audit after every transition (default: false)
    pub fn from_env() -> KernelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> KernelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_QUANTUM_TICKS) {
            config.quantum_ticks = parse_number(ENV_QUANTUM_TICKS, &raw)?;
        }

        if let Some(raw) = lookup(ENV_TICK_MICROS) {
            let micros: u64 = parse_number(ENV_TICK_MICROS, &raw)?;
            config.clock = if micros == 0 {
                ClockMode::Manual
            } else {
                ClockMode::Interval(Duration::from_micros(micros))
            };
        }

        if let Some(raw) = lookup(ENV_READY_CAPACITY) {
            config.ready_capacity = Some(parse_number(ENV_READY_CAPACITY, &raw)?);
        }

        if let Some(raw) = lookup(ENV_CHECK_INVARIANTS) {
            config.check_invariants = matches!(raw.trim(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the dispatcher cannot honour
    pub fn validate(&self) -> KernelResult<()> {
        if self.quantum_ticks == 0 {
            return Err(KernelError::InvalidConfig(
                "quantum must be at least one tick".into(),
            ));
        }

        if let ClockMode::Interval(period) = self.clock {
            if period.is_zero() || period > MAX_TICK_INTERVAL {
                return Err(KernelError::InvalidConfig(format!(
                    "tick interval {:?} must be between 1us and {:?}",
                    period, MAX_TICK_INTERVAL
                )));
            }
        }

        if self.ready_capacity == Some(0) {
            return Err(KernelError::InvalidConfig(
                "ready capacity must be positive".into(),
            ));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> KernelResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| KernelError::InvalidConfig(format!("{}={:?} is not a number", key, raw)))
}

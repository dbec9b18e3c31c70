/*!
 * Structured Tracing
 * Subscriber setup and per-process spans using the tracing crate
 *
 * Features:
 * - Env-filtered output (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - One span per process thread carrying pid, name and class
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::core::types::{Pid, ProcessClass};
use std::time::Instant;
use tracing::{debug, info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Whether an `RTK_TRACE_JSON` value asks for JSON output
pub fn json_requested(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RTK_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
/// Returns whether this call installed the subscriber.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = json_requested(std::env::var(ENV_TRACE_JSON).ok().as_deref());

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering the lifetime of one process thread
pub struct ProcessSpan {
    span: Span,
    start: Instant,
    pid: Pid,
}

impl ProcessSpan {
    pub fn new(pid: Pid, name: &str, class: ProcessClass) -> Self {
        let span = span!(
            Level::DEBUG,
            "process",
            pid = pid.0,
            name = name,
            class = class.as_str(),
        );

        Self {
            span,
            start: Instant::now(),
            pid,
        }
    }

    /// Enter the span for the rest of the thread's work
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ProcessSpan {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        debug!(
            pid = %self.pid,
            lifetime_us = self.start.elapsed().as_micros() as u64,
            "Process thread finished"
        );
    }
}

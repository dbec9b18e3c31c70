/*!
 * Monitoring
 * Structured logging setup and process spans
 */

mod tracer;

pub use tracer::{init_tracing, json_requested, ProcessSpan};

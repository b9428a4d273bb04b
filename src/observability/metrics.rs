//! Metrics collection.
//!
//! # Metrics
//! - `wirecall_http_dispatch_total` (counter): dispatches by verb and status
//! - `wirecall_http_dispatch_duration_seconds` (histogram): time to response head
//! - `wirecall_socket_emit_total` (counter): emissions by strategy and outcome
//! - `wirecall_stream_messages_total` (counter): decoded messages by mode
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Labels are small, fixed sets; no paths or ids

use std::time::Instant;

/// Record one HTTP dispatch. `status` is 0 when the transport failed.
pub fn record_dispatch(verb: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "wirecall_http_dispatch_total",
        "verb" => verb.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("wirecall_http_dispatch_duration_seconds", "verb" => verb.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one socket emission.
pub fn record_emit(strategy: &'static str, outcome: &'static str) {
    metrics::counter!(
        "wirecall_socket_emit_total",
        "strategy" => strategy,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record messages decoded by one stream consumer run.
pub fn record_stream_messages(mode: &'static str, count: u64) {
    metrics::counter!("wirecall_stream_messages_total", "mode" => mode).increment(count);
}

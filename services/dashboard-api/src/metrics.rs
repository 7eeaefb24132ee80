//! Service-level metrics.
//!
//! Pipeline and flow metrics are recorded inside the library crates; this
//! module adds per-action counters and timings for the HTTP surface.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register descriptions so `/metrics` carries HELP lines from the start.
pub fn describe() {
    describe_counter!("action_requests_total", "Dashboard actions by outcome");
    describe_histogram!("action_duration_seconds", "Dashboard action latency");
    describe_counter!("layer_fetch_total", "Layer bundle fetches by outcome");
    describe_histogram!("layer_fetch_duration_seconds", "Layer bundle fetch latency");
    describe_counter!("flow_requests_total", "Generative flow runs by flow and outcome");
}

/// Record one action outcome: `success`, `invalid` or `error`.
pub fn record_action(action: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("action_requests_total", "action" => action, "outcome" => outcome).increment(1);
    histogram!("action_duration_seconds", "action" => action).record(elapsed.as_secs_f64());
}

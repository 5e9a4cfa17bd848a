//! Prometheus metrics for the campaign engine.
//!
//! This module provides metrics for:
//! - Call dispatch (placed calls, outcomes, call duration)
//! - Status polling (timeouts, provider errors)
//! - Speech synthesis and outcome persistence

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Dispatch Metrics
// =============================================================================

/// Calls successfully handed to the telephony provider.
pub static CALLS_PLACED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("callcast_calls_placed_total", "Total calls placed").unwrap()
});

/// Terminal outcomes by result.
pub static CALL_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("callcast_call_outcomes_total", "Total recipients processed"),
        &["result"], // "completed", "busy", "no-answer", "timeout", "dial_error", "canceled", ...
    )
    .unwrap()
});

/// Time from placing a call to its terminal status, in seconds.
pub static CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "callcast_call_duration_seconds",
            "Duration from call placement to terminal status",
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Polling Metrics
// =============================================================================

/// Calls that never reached a terminal status in time.
pub static POLL_TIMEOUTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "callcast_poll_timeouts_total",
        "Total calls that exceeded the polling budget",
    )
    .unwrap()
});

/// Provider errors observed while polling (retried within the budget).
pub static POLL_PROVIDER_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "callcast_poll_provider_errors_total",
        "Total provider errors while polling call status",
    )
    .unwrap()
});

// =============================================================================
// Synthesis / Persistence Metrics
// =============================================================================

/// Speech synthesis requests by result.
pub static SYNTHESIS_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "callcast_synthesis_requests_total",
            "Total speech synthesis requests",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Outcome records that could not be persisted.
pub static OUTCOME_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "callcast_outcome_write_failures_total",
        "Total outcome records that failed to persist",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CALLS_PLACED.clone()),
        Box::new(CALL_OUTCOMES.clone()),
        Box::new(CALL_DURATION.clone()),
        Box::new(POLL_TIMEOUTS.clone()),
        Box::new(POLL_PROVIDER_ERRORS.clone()),
        Box::new(SYNTHESIS_REQUESTS.clone()),
        Box::new(OUTCOME_WRITE_FAILURES.clone()),
    ]
}

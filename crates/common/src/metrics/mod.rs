//! Metrics and observability utilities
//!
//! Metric names and descriptions for the crawler. Values are recorded
//! through the `metrics` facade; without an installed recorder they are
//! dropped.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Citegraph metrics
pub const METRICS_PREFIX: &str = "citegraph";

pub const CACHE_HITS: &str = "citegraph_cache_hits_total";
pub const CACHE_MISSES: &str = "citegraph_cache_misses_total";
pub const FETCH_REQUESTS: &str = "citegraph_fetch_requests_total";
pub const FETCH_RETRIES: &str = "citegraph_fetch_retries_total";
pub const FETCH_DURATION: &str = "citegraph_fetch_duration_seconds";
pub const NODES_VISITED: &str = "citegraph_nodes_visited_total";
pub const NODES_PRUNED: &str = "citegraph_nodes_pruned_total";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(CACHE_HITS, Unit::Count, "Paper lookups served from the disk cache");
    describe_counter!(CACHE_MISSES, Unit::Count, "Paper lookups that went to the network");

    describe_counter!(
        FETCH_REQUESTS,
        Unit::Count,
        "HTTP requests to the paper service, labelled by outcome"
    );
    describe_counter!(
        FETCH_RETRIES,
        Unit::Count,
        "Requests retried after a transient failure"
    );
    describe_histogram!(
        FETCH_DURATION,
        Unit::Seconds,
        "Latency of a single paper request in seconds"
    );

    describe_counter!(NODES_VISITED, Unit::Count, "Papers added to the traversal result");
    describe_counter!(
        NODES_PRUNED,
        Unit::Count,
        "Papers dropped because they could not be resolved"
    );
}

/// Record the outcome of one HTTP request
pub fn record_fetch(outcome: &'static str, started: Instant) {
    counter!(FETCH_REQUESTS, "outcome" => outcome).increment(1);
    histogram!(FETCH_DURATION).record(started.elapsed().as_secs_f64());
}

/// Record a retry after a transient failure
pub fn record_retry() {
    counter!(FETCH_RETRIES).increment(1);
}

/// Record a cache lookup
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(CACHE_HITS).increment(1);
    } else {
        counter!(CACHE_MISSES).increment(1);
    }
}

//! Metrics and observability utilities
//!
//! Prometheus-style metrics for the search paths: which path answered,
//! how long the external tool took, and how often the engine failed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all gateway metrics
pub const METRICS_PREFIX: &str = "graphrag";

/// `method_used` label for searches that ended in an error
pub const SEARCH_FAILED: &str = "error";

/// Buckets for search latency (in seconds); LLM-backed searches are slow
pub const SEARCH_BUCKETS: &[f64] = &[
    0.250,
    0.500,
    1.000,
    2.500,
    5.000,
    10.00,
    30.00,
    60.00,
    120.0,
    300.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries by method and answering path (or error)"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search latency in seconds"
    );

    describe_counter!(
        format!("{}_engine_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Engine calls that failed and fell back to the CLI"
    );

    describe_counter!(
        format!("{}_cli_invocations_total", METRICS_PREFIX),
        Unit::Count,
        "External CLI invocations by outcome"
    );

    describe_histogram!(
        format!("{}_cli_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "External CLI execution time in seconds"
    );

    describe_gauge!(
        format!("{}_dataset_rows", METRICS_PREFIX),
        Unit::Count,
        "Rows loaded per index artifact"
    );

    tracing::info!("Metrics registered");
}

/// Record a finished search, successful or not
pub fn record_search(duration_secs: f64, method: &str, method_used: &str) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "method" => method.to_string(),
        "method_used" => method_used.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .record(duration_secs);
}

/// Record an engine call that fell through to the CLI
pub fn record_engine_failure(method: &str) {
    counter!(
        format!("{}_engine_failures_total", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .increment(1);
}

/// Record one external CLI invocation
pub fn record_cli(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_cli_invocations_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(format!("{}_cli_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record the row count of a loaded artifact
pub fn record_dataset_rows(artifact: &str, rows: usize) {
    gauge!(
        format!("{}_dataset_rows", METRICS_PREFIX),
        "artifact" => artifact.to_string()
    )
    .set(rows as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in SEARCH_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        // The CLI timeout must land in a bucket
        assert!(SEARCH_BUCKETS.contains(&300.0));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops and must not panic
        record_search(0.5, "global", "api");
        record_search(2.0, "local", SEARCH_FAILED);
        record_engine_failure("local");
        record_cli(1.2, false);
        record_dataset_rows("entities", 42);
    }
}

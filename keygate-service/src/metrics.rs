//! Metrics definitions for the key operation gateway.
//!
//! This module defines all metrics keys used by the gateway and
//! provides a helper [`describe_metrics`] to set metadata for
//! each metric using the `metrics` crate.

/// Metrics key for counting submitted backend operations
pub const METRICS_ID_GATEWAY_OP_START: &str = "keygate.gateway.op.start";
/// Metrics key for counting backend operations that returned `Ok`
pub const METRICS_ID_GATEWAY_OP_SUCCESS: &str = "keygate.gateway.op.success";
/// Metrics key for counting backend operations that returned an error
pub const METRICS_ID_GATEWAY_OP_FAILED: &str = "keygate.gateway.op.failed";
/// Metrics key for counting backend operations that exceeded the timeout
pub const METRICS_ID_GATEWAY_OP_TIMEOUT: &str = "keygate.gateway.op.timeout";
/// Metrics key for the duration a caller waited for an operation
pub const METRICS_ID_GATEWAY_OP_DURATION: &str = "keygate.gateway.op.duration";
/// Metrics key for currently running backend operations
pub const METRICS_ID_GATEWAY_IN_FLIGHT: &str = "keygate.gateway.in_flight";
/// Metrics key for backend operations still running after their caller timed out
pub const METRICS_ID_GATEWAY_ABANDONED: &str = "keygate.gateway.abandoned";

/// Metrics label for the operation name.
pub const METRICS_ATTRID_OPERATION: &str = "operation";

/// Describe all metrics used by the gateway.
///
/// This calls the `describe_*` functions from the `metrics` crate to set metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_GATEWAY_OP_START,
        metrics::Unit::Count,
        "Number of backend operations submitted to the worker pool"
    );

    metrics::describe_counter!(
        METRICS_ID_GATEWAY_OP_SUCCESS,
        metrics::Unit::Count,
        "Number of backend operations that completed successfully"
    );

    metrics::describe_counter!(
        METRICS_ID_GATEWAY_OP_FAILED,
        metrics::Unit::Count,
        "Number of backend operations that failed"
    );

    metrics::describe_counter!(
        METRICS_ID_GATEWAY_OP_TIMEOUT,
        metrics::Unit::Count,
        "Number of backend operations the caller stopped waiting for"
    );

    metrics::describe_histogram!(
        METRICS_ID_GATEWAY_OP_DURATION,
        metrics::Unit::Milliseconds,
        "Time callers waited for a backend operation"
    );

    metrics::describe_gauge!(
        METRICS_ID_GATEWAY_IN_FLIGHT,
        metrics::Unit::Count,
        "Number of backend operations currently running in the worker pool"
    );

    metrics::describe_gauge!(
        METRICS_ID_GATEWAY_ABANDONED,
        metrics::Unit::Count,
        "Number of backend operations still running after their caller timed out"
    );
}

//! Metrics for `SQLite` store operations.

use std::time::Instant;

/// Records the count and latency of one store operation.
///
/// Emits `store_operations_total` and `store_operation_duration_ms`, both
/// labelled by operation and status (`success` or `error`).
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "store_operations_total",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "store_operation_duration_ms",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a result to its metrics status label.
pub const fn status_of<T>(result: &crate::Result<T>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_operation_metrics("save", Instant::now(), "success");
        record_operation_metrics("save", Instant::now(), "error");
    }

    #[test]
    fn test_status_of() {
        assert_eq!(status_of(&Ok::<_, Error>(1)), "success");
        assert_eq!(status_of::<()>(&Err(Error::InvalidInput("x".to_string()))), "error");
    }
}

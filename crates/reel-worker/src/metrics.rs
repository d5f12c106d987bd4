//! Compilation metrics.
//!
//! Recorded through the `metrics` facade; the binary installs a Prometheus
//! exporter when `METRICS_ADDR` is set, otherwise the calls are no-ops.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Metric name constants for consistency.
pub mod names {
    /// Jobs by terminal outcome (`uploaded` / `failed`).
    pub const JOBS_TOTAL: &str = "reel_jobs_total";

    /// Clips successfully trimmed.
    pub const CLIPS_EXTRACTED_TOTAL: &str = "reel_clips_extracted_total";

    /// Recommendations replaced by the default interval, by reason.
    pub const INTERVAL_FALLBACKS_TOTAL: &str = "reel_interval_fallbacks_total";

    /// Clips that needed the fixed-interval retry.
    pub const TRANSCODE_RETRIES_TOTAL: &str = "reel_transcode_retries_total";

    /// Background tracks dropped in favour of original-only audio, by reason.
    pub const BACKGROUND_FALLBACKS_TOTAL: &str = "reel_background_fallbacks_total";

    /// End-to-end job duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "reel_job_duration_seconds";
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Record a finished job.
pub fn record_job(outcome: &str, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => outcome.to_string())
        .record(duration_secs);
}

pub fn record_clip_extracted() {
    counter!(names::CLIPS_EXTRACTED_TOTAL).increment(1);
}

pub fn record_interval_fallback(reason: &str) {
    counter!(names::INTERVAL_FALLBACKS_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn record_transcode_retry() {
    counter!(names::TRANSCODE_RETRIES_TOTAL).increment(1);
}

pub fn record_background_fallback(reason: &str) {
    counter!(names::BACKGROUND_FALLBACKS_TOTAL, "reason" => reason.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        for name in [
            names::JOBS_TOTAL,
            names::CLIPS_EXTRACTED_TOTAL,
            names::INTERVAL_FALLBACKS_TOTAL,
            names::TRANSCODE_RETRIES_TOTAL,
            names::BACKGROUND_FALLBACKS_TOTAL,
            names::JOB_DURATION_SECONDS,
        ] {
            assert!(name.starts_with("reel_"));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_job("uploaded", 1.5);
        record_interval_fallback("timeout");
        record_background_fallback("fetch");
    }
}

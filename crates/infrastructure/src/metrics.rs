//! Metrics for jobs, extraction and uploads.
//!
//! Thin wrapper over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so tests never need to set one up.

use metrics::{counter, histogram};
use tracing::debug;

/// Metrics collector for the collector service
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // Scheduler metrics

    /// Record a completed job run
    pub fn record_job_run(&self, job: &str, duration_seconds: f64) {
        counter!("collector_job_runs_total", "job" => job.to_string()).increment(1);
        histogram!("collector_job_duration_seconds", "job" => job.to_string())
            .record(duration_seconds);
    }

    /// Record a failed job run
    pub fn record_job_failure(&self, job: &str, error_kind: &str) {
        counter!(
            "collector_job_failures_total",
            "job" => job.to_string(),
            "error" => error_kind.to_string()
        )
        .increment(1);
    }

    // Extraction metrics

    /// Record a finished extraction
    pub fn record_extraction(&self, dataset: &str, records: usize, duration_seconds: f64) {
        counter!("collector_records_extracted_total", "dataset" => dataset.to_string())
            .increment(records as u64);
        histogram!("collector_extraction_duration_seconds", "dataset" => dataset.to_string())
            .record(duration_seconds);
        debug!(dataset, records, duration_seconds, "Extraction completed");
    }

    /// Record the number of calendar steps taken to reach the target day
    pub fn record_navigation_steps(&self, steps: u32) {
        histogram!("collector_calendar_navigation_steps").record(steps as f64);
    }

    // Upload metrics

    /// Record an upload decision: `uploaded`, `skipped` or `failed`
    pub fn record_upload(&self, dataset: &str, outcome: &str) {
        counter!(
            "collector_uploads_total",
            "dataset" => dataset.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }
}

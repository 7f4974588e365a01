//! Job metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that exports them.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use vgrab_models::JobAction;

/// Metric names.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vgrab_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vgrab_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vgrab_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "vgrab_job_duration_seconds";
    pub const JOBS_PRUNED_TOTAL: &str = "vgrab_jobs_pruned_total";
    pub const JOBS_TRACKED: &str = "vgrab_jobs_tracked";
}

/// Record job submitted.
pub fn record_job_submitted(action: JobAction) {
    let labels = [("action", action.as_str().to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record job completed.
pub fn record_job_completed(action: JobAction, duration: Duration) {
    let labels = [("action", action.as_str().to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration.as_secs_f64());
}

/// Record job failed.
pub fn record_job_failed(action: JobAction, duration: Duration) {
    let labels = [("action", action.as_str().to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration.as_secs_f64());
}

/// Record a reaper pass.
pub fn record_jobs_pruned(pruned: usize, remaining: usize) {
    counter!(names::JOBS_PRUNED_TOTAL).increment(pruned as u64);
    gauge!(names::JOBS_TRACKED).set(remaining as f64);
}

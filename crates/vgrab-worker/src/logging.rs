//! Job tracing.
//!
//! One `job` span per supervised job. The span carries the job id and
//! action, plus `stage` and `progress` fields that are re-recorded as the
//! supervisor moves through the pipeline, so every event logged inside a
//! stage (including tool output from `vgrab-media`) is attributed to it.

use std::fmt;
use std::time::Duration;

use tracing::field::Empty;
use tracing::{error, info, warn, Span};
use vgrab_models::{Job, JobAction, JobResult};

use crate::error::WorkerError;

/// Pipeline stage of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transcribe,
    Register,
    Summarize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Register => "register",
            Stage::Summarize => "summarize",
        }
    }

    /// Stages a job with `action` passes through, in order.
    pub fn plan(action: JobAction) -> &'static [Stage] {
        match action {
            JobAction::Download | JobAction::ExtractAudio => &[Stage::Extract, Stage::Register],
            JobAction::Transcribe | JobAction::Subtitles => {
                &[Stage::Extract, Stage::Transcribe, Stage::Register]
            }
            JobAction::Summarize => &[
                Stage::Extract,
                Stage::Transcribe,
                Stage::Register,
                Stage::Summarize,
            ],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Span plus lifecycle events for one job.
#[derive(Debug, Clone)]
pub struct JobTrace {
    span: Span,
}

impl JobTrace {
    pub fn new(job: &Job) -> Self {
        let span = tracing::info_span!(
            "job",
            job_id = %job.job_id,
            action = %job.action,
            stage = Empty,
            progress = Empty,
        );
        Self { span }
    }

    /// Span to instrument the supervisor future with.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn started(&self, job: &Job) {
        let plan: Vec<&str> = Stage::plan(job.action).iter().map(Stage::as_str).collect();
        info!(url = %job.url, stages = ?plan, "Job started");
    }

    /// Record entry into `stage` at `progress` percent.
    pub fn enter(&self, stage: Stage, progress: u8) {
        self.span.record("stage", stage.as_str());
        self.span.record("progress", progress);
        info!("Entering {} stage", stage);
    }

    pub fn progress(&self, progress: u8) {
        self.span.record("progress", progress);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    pub fn completed(&self, result: &JobResult, elapsed: Duration) {
        self.span.record("progress", 100u8);
        let files = result.files();
        info!(
            files = files.len(),
            file_ids = ?files,
            elapsed_secs = elapsed.as_secs_f64(),
            "Job completed"
        );
    }

    /// Log a failure with its raw cause. The caller-facing message is
    /// logged alongside so the two can be matched up.
    pub fn failed(&self, err: &WorkerError, elapsed: Duration) {
        error!(
            error = %err,
            user_message = %err.user_message(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Job failed"
        );
    }
}

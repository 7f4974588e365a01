//! Job records and their lifecycle state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::file::ResultFile;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(format!("job_{}", Uuid::new_v4().simple()))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
///
/// ```text
/// queued -> running -> running ... -> completed | failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, supervisor not started yet
    #[default]
    Queued,
    /// External process running
    Running,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Completed | Failed, _) => false,
            (Queued, Queued | Running) => true,
            (Running, Running | Completed | Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact requested for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// Muxed video file
    Download,
    /// Audio-only file
    #[serde(alias = "audio")]
    ExtractAudio,
    /// Audio plus transcript preview and files
    Transcribe,
    /// Audio plus subtitle files
    Subtitles,
    /// Transcript plus heuristic summary
    Summarize,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Download => "download",
            JobAction::ExtractAudio => "extract_audio",
            JobAction::Transcribe => "transcribe",
            JobAction::Subtitles => "subtitles",
            JobAction::Summarize => "summarize",
        }
    }

    /// Parse an action name, accepting the `audio` alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "download" => Some(JobAction::Download),
            "extract_audio" | "audio" => Some(JobAction::ExtractAudio),
            "transcribe" => Some(JobAction::Transcribe),
            "subtitles" => Some(JobAction::Subtitles),
            "summarize" => Some(JobAction::Summarize),
            _ => None,
        }
    }

    /// Whether a speech-recognition stage follows extraction.
    pub fn needs_transcription(&self) -> bool {
        matches!(
            self,
            JobAction::Transcribe | JobAction::Subtitles | JobAction::Summarize
        )
    }

    /// Whether extraction runs in audio-only mode.
    pub fn wants_audio(&self) -> bool {
        !matches!(self, JobAction::Download)
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heuristic summary derived from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub short_summary: String,
    pub key_takeaways: Vec<String>,
    pub medium_summary: String,
}

/// Result payload of a completed job, one variant per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobResult {
    Download {
        file_id: String,
        filename: String,
        download_url: String,
    },
    ExtractAudio {
        file_id: String,
        filename: String,
        download_url: String,
    },
    Transcribe {
        text: String,
        files: Vec<ResultFile>,
    },
    Subtitles {
        files: Vec<ResultFile>,
    },
    Summarize {
        text: String,
        files: Vec<ResultFile>,
        summary: Summary,
    },
}

impl JobResult {
    /// Single-file result for download / extract_audio.
    pub fn single_file(action: JobAction, file: ResultFile) -> Self {
        let ResultFile {
            file_id,
            filename,
            download_url,
            ..
        } = file;
        match action {
            JobAction::Download => JobResult::Download {
                file_id,
                filename,
                download_url,
            },
            _ => JobResult::ExtractAudio {
                file_id,
                filename,
                download_url,
            },
        }
    }

    /// Files listed by the result, in order.
    pub fn files(&self) -> Vec<&str> {
        match self {
            JobResult::Download { file_id, .. } | JobResult::ExtractAudio { file_id, .. } => {
                vec![file_id.as_str()]
            }
            JobResult::Transcribe { files, .. }
            | JobResult::Subtitles { files }
            | JobResult::Summarize { files, .. } => {
                files.iter().map(|f| f.file_id.as_str()).collect()
            }
        }
    }
}

/// A job tracked by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    /// 0..=100, non-decreasing
    pub progress: u8,
    pub action: JobAction,
    /// Submitted URL, unmodified
    pub url: String,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(url: impl Into<String>, action: JobAction) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            status: JobStatus::Queued,
            progress: 0,
            action,
            url: url.into(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this job.
    ///
    /// Fields left as `None` keep their value. Progress is clamped to 100
    /// and never decreases; completing a job forces it to 100.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), JobUpdateRejected> {
        if self.status.is_terminal() {
            return Err(JobUpdateRejected::Terminal(self.status));
        }

        let next = update.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next) {
            return Err(JobUpdateRejected::Transition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if next == JobStatus::Completed {
            self.progress = 100;
        }
        if update.result.is_some() {
            self.result = update.result;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update with merge semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self {
            status: Some(JobStatus::Running),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed(result: JobResult) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Why an update was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobUpdateRejected {
    #[error("job is already {0}")]
    Terminal(JobStatus),

    #[error("invalid transition {from} -> {to}")]
    Transition { from: JobStatus, to: JobStatus },
}

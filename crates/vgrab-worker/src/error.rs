//! Worker error types.

use thiserror::Error;

use vgrab_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Message shown for failures with no more specific wording.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing job.";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[source] MediaError),

    #[error("Transcription failed: {0}")]
    Transcription(#[source] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vgrab_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Caller-facing error string stored on a failed job.
    ///
    /// Tool diagnostics stay in the logs; only these fixed messages reach
    /// the job record.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::InvalidRequest(msg) => msg.clone(),
            WorkerError::Extraction(e) => match e {
                MediaError::SpawnFailed { .. } => "System error: could not start downloader.".to_string(),
                MediaError::FileTooSmall { .. } => "Download validation failed (file too small)".to_string(),
                _ => "Download failed or file not found.".to_string(),
            },
            WorkerError::Transcription(e) => match e {
                MediaError::SpawnFailed { .. } => {
                    "Transcription unavailable. Whisper command not found.".to_string()
                }
                MediaError::Timeout(_) => "Transcription timed out. The audio may be too long.".to_string(),
                MediaError::ToolFailed { exit_code, .. } => format!(
                    "Transcription process failed (exit code {}).",
                    exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
                ),
                MediaError::OutputsMissing(_) => "Transcription outputs missing.".to_string(),
                _ => INTERNAL_ERROR_MESSAGE.to_string(),
            },
            WorkerError::Storage(_) | WorkerError::Io(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

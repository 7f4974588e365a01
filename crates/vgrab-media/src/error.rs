//! Error types for media operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving an external tool.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {exit_code:?}")]
    ToolFailed {
        program: String,
        exit_code: Option<i32>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Output file too small: {size} bytes (minimum {min})")]
    FileTooSmall { size: u64, min: u64 },

    #[error("Expected outputs missing: {0}")]
    OutputsMissing(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    pub fn tool_failed(program: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ToolFailed {
            program: program.into(),
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn outputs_missing(message: impl Into<String>) -> Self {
        Self::OutputsMissing(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        assert_eq!(
            MediaError::Timeout(Duration::from_millis(300)).to_string(),
            "Operation timed out after 300ms"
        );
        assert_eq!(
            MediaError::Timeout(Duration::from_secs(7200)).to_string(),
            "Operation timed out after 7200s"
        );
    }
}

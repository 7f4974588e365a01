//! Artifact metadata shared by the registry, the supervisor and the API.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Route serving registered artifacts.
pub const DOWNLOAD_ROUTE: &str = "/api/download";

/// Build the download reference for a file id.
pub fn download_url(file_id: &str) -> String {
    format!("{}?fileId={}", DOWNLOAD_ROUTE, urlencoding::encode(file_id))
}

/// Registry entry for a file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Registry key; equals `filename` by convention
    pub file_id: String,
    pub filename: String,
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Metadata keyed by the file's own name.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        let filename = filename.into();
        Self {
            file_id: filename.clone(),
            filename,
            content_type: content_type.into(),
            size,
            created_at: Utc::now(),
        }
    }
}

/// A file listed in a job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultFile {
    pub label: String,
    pub file_id: String,
    pub filename: String,
    pub download_url: String,
}

impl ResultFile {
    pub fn new(label: impl Into<String>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            label: label.into(),
            download_url: download_url(&filename),
            file_id: filename.clone(),
            filename,
        }
    }

    pub fn from_metadata(label: impl Into<String>, meta: &FileMetadata) -> Self {
        Self {
            label: label.into(),
            file_id: meta.file_id.clone(),
            filename: meta.filename.clone(),
            download_url: download_url(&meta.file_id),
        }
    }
}

//! Shared data models for VGrab.
//!
//! This crate provides Serde-serializable types for:
//! - Platform detection and URL normalization
//! - Jobs, their lifecycle and per-action results
//! - Artifact metadata

pub mod file;
pub mod job;
pub mod platform;

// Re-export common types
pub use file::{download_url, FileMetadata, ResultFile, DOWNLOAD_ROUTE};
pub use job::{Job, JobAction, JobId, JobResult, JobStatus, JobUpdate, JobUpdateRejected, Summary};
pub use platform::{normalize, NormalizedResult, Platform};

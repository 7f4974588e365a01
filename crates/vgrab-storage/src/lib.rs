//! Artifact registry and job store.
//!
//! This crate provides:
//! - A file registry backed by a JSON index in the output directory
//! - An in-memory, concurrency-safe job table with lifecycle enforcement
//! - Expiry of terminal jobs

pub mod error;
pub mod job_store;
pub mod registry;

pub use error::{StorageError, StorageResult};
pub use job_store::JobStore;
pub use registry::{FileRegistry, INDEX_FILENAME};

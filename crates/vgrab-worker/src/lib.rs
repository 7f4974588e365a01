//! Job orchestration for VGrab.
//!
//! This crate provides:
//! - Per-job supervision of the extractor and transcriber processes
//! - The heuristic transcript summarizer
//! - The orchestrator owning job submission and expiry
//! - Worker configuration, structured job logging and job metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod summary;
pub mod supervisor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{JobTrace, Stage};
pub use orchestrator::{JobOrchestrator, URL_REQUIRED};
pub use summary::summarize;
pub use supervisor::ProcessSupervisor;

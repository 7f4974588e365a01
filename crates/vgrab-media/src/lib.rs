//! External media tools for VGrab.
//!
//! This crate provides:
//! - A runner for external executables with line streaming and timeouts
//! - The yt-dlp output line protocol
//! - Media extraction with size validation and scoped cookie files
//! - Speech recognition via the whisper CLI

pub mod command;
pub mod download;
pub mod error;
pub mod progress;
pub mod transcribe;

pub use command::{ToolCommand, ToolRunner};
pub use download::{content_type_for, ExtractMode, ExtractedFile, Extractor};
pub use error::{MediaError, MediaResult};
pub use progress::{parse_line, LineEvent, ProgressTracker};
pub use transcribe::{locate_whisper, TranscriptFile, TranscriptFormat, Transcriber, Transcription};

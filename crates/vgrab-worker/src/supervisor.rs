//! Per-job process supervision.
//!
//! A supervisor task drives one job from `queued` to a terminal state:
//!
//! 1. Extraction with yt-dlp, streaming progress into the job store
//! 2. For transcribe / subtitles / summarize, whisper on the extracted audio
//! 3. For summarize, an in-process heuristic summary
//!
//! Every failure is caught here and written to the job as a fixed,
//! caller-facing message. Nothing is retried.

use std::path::PathBuf;
use std::time::Instant;

use tracing::Instrument;

use vgrab_media::{locate_whisper, ExtractMode, Extractor, ProgressTracker, Transcriber};
use vgrab_models::{Job, JobAction, JobId, JobResult, JobUpdate, ResultFile};
use vgrab_storage::{FileRegistry, JobStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobTrace, Stage};
use crate::metrics;
use crate::summary::{summarize, truncate_chars, PREVIEW_CHARS};

/// Progress reported when the speech-recognition stage starts.
const TRANSCRIPTION_START_PROGRESS: u8 = 50;

/// Label of the extracted audio in multi-file results.
const ORIGINAL_AUDIO_LABEL: &str = "Original Audio";

/// Drives jobs through extraction and transcription.
#[derive(Clone)]
pub struct ProcessSupervisor {
    store: JobStore,
    registry: FileRegistry,
    extractor: Extractor,
    transcriber: Transcriber,
}

impl ProcessSupervisor {
    pub fn new(
        store: JobStore,
        registry: FileRegistry,
        extractor: Extractor,
        transcriber: Transcriber,
    ) -> Self {
        Self {
            store,
            registry,
            extractor,
            transcriber,
        }
    }

    /// Build the tool wrappers from configuration.
    pub fn from_config(config: &WorkerConfig, store: JobStore, registry: FileRegistry) -> Self {
        let output_dir = registry.root().to_path_buf();

        let extractor = Extractor::new(&config.ytdlp_bin, &output_dir)
            .with_cookies(config.cookies.clone())
            .with_min_output_bytes(config.min_output_bytes);

        let home = std::env::var_os("HOME").map(PathBuf::from);
        let whisper = locate_whisper(config.whisper_bin.as_deref(), home.as_deref());
        let transcriber = Transcriber::new(whisper, &output_dir)
            .with_model(&config.whisper_model)
            .with_timeout(config.transcribe_timeout);

        Self::new(store, registry, extractor, transcriber)
    }

    /// Drive `job_id` to a terminal state.
    pub async fn run(&self, job_id: JobId) {
        let Some(job) = self.store.get(&job_id) else {
            tracing::warn!(job_id = %job_id, "Supervisor started for unknown job");
            return;
        };

        let trace = JobTrace::new(&job);

        async {
            let started = Instant::now();
            self.store.update(&job.job_id, JobUpdate::running());
            trace.started(&job);

            match self.execute(&job, &trace).await {
                Ok(result) => {
                    trace.completed(&result, started.elapsed());
                    self.store.update(&job.job_id, JobUpdate::completed(result));
                    metrics::record_job_completed(job.action, started.elapsed());
                }
                Err(e) => {
                    trace.failed(&e, started.elapsed());
                    self.store.update(&job.job_id, JobUpdate::failed(e.user_message()));
                    metrics::record_job_failed(job.action, started.elapsed());
                }
            }
        }
        .instrument(trace.span())
        .await
    }

    async fn execute(&self, job: &Job, trace: &JobTrace) -> WorkerResult<JobResult> {
        let action = job.action;
        let mode = if action.wants_audio() {
            ExtractMode::Audio
        } else {
            ExtractMode::Video
        };

        // Two-stage jobs report extraction in the 0..=50 band.
        let mut tracker = ProgressTracker::new(action.needs_transcription());
        let store = &self.store;
        let job_id = &job.job_id;

        trace.enter(Stage::Extract, 0);
        let extracted = self
            .extractor
            .extract(job_id.as_str(), &job.url, mode, |percent| {
                if let Some(progress) = tracker.observe(percent) {
                    store.update(job_id, JobUpdate::progress(progress));
                    trace.progress(progress);
                }
            })
            .await
            .map_err(WorkerError::Extraction)?;

        tracing::info!(filename = %extracted.filename, size = extracted.size, "Extracted media");

        if !action.needs_transcription() {
            trace.enter(Stage::Register, 100);
            let meta = self
                .registry
                .register_file(&extracted.path, extracted.content_type)
                .await?;
            let file = ResultFile::from_metadata(action.as_str(), &meta);
            return Ok(JobResult::single_file(action, file));
        }

        self.store
            .update(job_id, JobUpdate::progress(TRANSCRIPTION_START_PROGRESS));
        trace.enter(Stage::Transcribe, TRANSCRIPTION_START_PROGRESS);

        let transcription = self
            .transcriber
            .transcribe(&extracted.path)
            .await
            .map_err(WorkerError::Transcription)?;

        trace.enter(Stage::Register, TRANSCRIPTION_START_PROGRESS);
        let audio = self
            .registry
            .register_file(&extracted.path, extracted.content_type)
            .await?;
        let mut files = vec![ResultFile::from_metadata(ORIGINAL_AUDIO_LABEL, &audio)];

        for output in &transcription.files {
            let meta = self
                .registry
                .register_file(&output.path, output.format.content_type())
                .await?;
            files.push(ResultFile::from_metadata(output.format.label(), &meta));
        }

        if transcription.text.is_empty() {
            trace.warn("No plain-text transcript produced");
        }
        let text = truncate_chars(&transcription.text, PREVIEW_CHARS).to_string();

        Ok(match action {
            JobAction::Summarize => {
                trace.enter(Stage::Summarize, TRANSCRIPTION_START_PROGRESS);
                JobResult::Summarize {
                    summary: summarize(&transcription.text),
                    text,
                    files,
                }
            }
            JobAction::Transcribe => JobResult::Transcribe { text, files },
            _ => JobResult::Subtitles { files },
        })
    }
}

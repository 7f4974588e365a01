//! Speech recognition using the whisper CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::command::{ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Default wall-clock budget for one transcription.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default model, chosen for speed on small hosts.
pub const DEFAULT_MODEL: &str = "tiny";

/// Output formats collected after a run, in result order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Text,
    Srt,
    Vtt,
    Json,
}

impl TranscriptFormat {
    pub const ALL: [TranscriptFormat; 4] = [
        TranscriptFormat::Text,
        TranscriptFormat::Srt,
        TranscriptFormat::Vtt,
        TranscriptFormat::Json,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Text => "txt",
            TranscriptFormat::Srt => "srt",
            TranscriptFormat::Vtt => "vtt",
            TranscriptFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TranscriptFormat::Text => "text/plain",
            TranscriptFormat::Srt => "application/x-subrip",
            TranscriptFormat::Vtt => "text/vtt",
            TranscriptFormat::Json => "application/json",
        }
    }

    /// Label shown next to the file in results.
    pub fn label(&self) -> &'static str {
        match self {
            TranscriptFormat::Text => "Transcript (TXT)",
            TranscriptFormat::Srt => "Subtitles (SRT)",
            TranscriptFormat::Vtt => "Subtitles (VTT)",
            TranscriptFormat::Json => "Segments (JSON)",
        }
    }
}

/// One output file written by whisper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    pub format: TranscriptFormat,
    pub path: PathBuf,
}

/// Outputs of a successful transcription.
#[derive(Debug, Clone, Default)]
pub struct Transcription {
    /// Present files, in [`TranscriptFormat::ALL`] order
    pub files: Vec<TranscriptFile>,
    /// Contents of the plain-text output, empty if none was written
    pub text: String,
}

/// Pick the whisper executable.
///
/// An explicit path wins, then a pipx install under `$HOME/.local/bin`,
/// then a bare `whisper` resolved through `PATH`.
pub fn locate_whisper(explicit: Option<&Path>, home: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(home) = home {
        let pipx = home.join(".local/bin/whisper");
        if pipx.is_file() {
            return pipx;
        }
    }

    which::which("whisper").unwrap_or_else(|_| PathBuf::from("whisper"))
}

/// whisper wrapper bound to an output directory.
#[derive(Debug, Clone)]
pub struct Transcriber {
    program: PathBuf,
    model: String,
    output_dir: PathBuf,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            model: DEFAULT_MODEL.to_string(),
            output_dir: output_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_args(&self, audio: &Path) -> Vec<String> {
        vec![
            audio.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "all".to_string(),
            "--output_dir".to_string(),
            self.output_dir.to_string_lossy().into_owned(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }

    /// Paths whisper writes for `audio`, by format.
    pub fn expected_outputs(&self, audio: &Path) -> Vec<TranscriptFile> {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        TranscriptFormat::ALL
            .iter()
            .map(|format| TranscriptFile {
                format: *format,
                path: self
                    .output_dir
                    .join(format!("{}.{}", stem, format.extension())),
            })
            .collect()
    }

    /// Transcribe `audio`, killing whisper if it exceeds the timeout.
    ///
    /// Fails with [`MediaError::OutputsMissing`] if the run succeeds but
    /// none of the expected files exist.
    pub async fn transcribe(&self, audio: &Path) -> MediaResult<Transcription> {
        let cmd = ToolCommand::new(&self.program).args(self.build_args(audio));
        info!(audio = %audio.display(), model = %self.model, "Starting transcription");

        let status = ToolRunner::new()
            .with_timeout(self.timeout)
            .run_with_lines(&cmd, |line| debug!(tool = "whisper", "{}", line))
            .await?;

        if !status.success() {
            return Err(MediaError::tool_failed(cmd.name(), status.code()));
        }

        let mut transcription = Transcription::default();
        for output in self.expected_outputs(audio) {
            if !tokio::fs::try_exists(&output.path).await.unwrap_or(false) {
                continue;
            }
            if output.format == TranscriptFormat::Text {
                transcription.text = tokio::fs::read_to_string(&output.path).await?;
            }
            transcription.files.push(output);
        }

        if transcription.files.is_empty() {
            return Err(MediaError::outputs_missing(format!(
                "no transcript files for {}",
                audio.display()
            )));
        }

        info!(files = transcription.files.len(), "Transcription finished");
        Ok(transcription)
    }
}

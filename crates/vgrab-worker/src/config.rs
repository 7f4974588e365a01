//! Worker configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Shared directory for all artifacts, always absolute
    pub output_dir: PathBuf,
    /// yt-dlp executable
    pub ytdlp_bin: PathBuf,
    /// Explicit whisper executable; located automatically when unset
    pub whisper_bin: Option<PathBuf>,
    /// Whisper model variant
    pub whisper_model: String,
    /// Wall-clock budget for one transcription
    pub transcribe_timeout: Duration,
    /// Extracted files below this size are deleted and the job fails
    pub min_output_bytes: u64,
    /// Netscape cookie jar passed to the extractor
    pub cookies: Option<String>,
    /// Terminal jobs older than this are pruned; zero disables pruning
    pub job_ttl: Duration,
    /// How often the reaper runs
    pub reap_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: absolute("./outputs"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
            whisper_bin: None,
            whisper_model: "tiny".to_string(),
            transcribe_timeout: Duration::from_secs(300), // 5 minutes
            min_output_bytes: 10 * 1024,
            cookies: None,
            job_ttl: Duration::from_secs(6 * 3600),
            reap_interval: Duration::from_secs(300),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            output_dir: lookup("OUTPUT_DIR")
                .filter(|s| !s.is_empty())
                .map(absolute)
                .unwrap_or(defaults.output_dir),
            ytdlp_bin: lookup("YTDLP_BIN")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_bin),
            whisper_bin: lookup("WHISPER_BIN")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            whisper_model: lookup("WHISPER_MODEL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.whisper_model),
            transcribe_timeout: secs("TRANSCRIBE_TIMEOUT_SECS", defaults.transcribe_timeout),
            min_output_bytes: lookup("MIN_OUTPUT_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_output_bytes),
            cookies: lookup("COOKIES_TXT").filter(|s| !s.trim().is_empty()),
            job_ttl: secs("JOB_TTL_SECS", defaults.job_ttl),
            reap_interval: secs("JOB_REAP_INTERVAL_SECS", defaults.reap_interval),
        }
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("output_dir", &self.output_dir)
            .field("ytdlp_bin", &self.ytdlp_bin)
            .field("whisper_bin", &self.whisper_bin)
            .field("whisper_model", &self.whisper_model)
            .field("transcribe_timeout", &self.transcribe_timeout)
            .field("min_output_bytes", &self.min_output_bytes)
            .field("cookies", &self.cookies.as_ref().map(|_| "<redacted>"))
            .field("job_ttl", &self.job_ttl)
            .field("reap_interval", &self.reap_interval)
            .finish()
    }
}

/// Anchor a relative path at the working directory.
fn absolute(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path.strip_prefix(".").unwrap_or(&path)),
        Err(_) => path,
    }
}

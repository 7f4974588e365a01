//! Media extraction using yt-dlp.
//!
//! One extractor process per job. Output lands in the shared output
//! directory under yt-dlp's `<id>.<ext>` naming, so two jobs for the same
//! source video write the same file and the last one wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::command::{ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::parse_line;

/// Browser user agent presented to platforms.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Output naming template, keyed by the platform's video id.
pub const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

/// Default minimum size for a produced file (10 KiB).
pub const DEFAULT_MIN_OUTPUT_BYTES: u64 = 10 * 1024;

/// Video format preference: mp4 streams, then any mp4, then anything.
const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

const TIKTOK_REFERER: &str = "https://www.tiktok.com/";

/// What the extractor should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Muxed mp4
    Video,
    /// mp3 at best quality
    Audio,
}

/// A validated file produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub content_type: &'static str,
}

/// Content type for an extracted file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        _ => "video/mp4",
    }
}

/// Validate that a cookies blob appears to be in Netscape format.
///
/// Netscape cookie files either start with a `# Netscape HTTP Cookie File`
/// header or contain tab-separated lines with at least six fields.
pub fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File") || content.starts_with("# HTTP Cookie File") {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 6)
}

/// yt-dlp wrapper bound to an output directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: PathBuf,
    output_dir: PathBuf,
    cookies: Option<String>,
    min_output_bytes: u64,
}

impl Extractor {
    pub fn new(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            cookies: None,
            min_output_bytes: DEFAULT_MIN_OUTPUT_BYTES,
        }
    }

    /// Pass a cookie jar to every invocation.
    ///
    /// The blob is opaque and handed to yt-dlp as-is. One that does not look
    /// like a Netscape jar is still passed, with a warning. Blank blobs are
    /// dropped.
    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies.filter(|blob| !blob.trim().is_empty());
        if let Some(blob) = &self.cookies {
            if !is_valid_netscape_cookies(blob) {
                warn!("Configured cookies do not look like a Netscape cookie file, passing as-is");
            }
        }
        self
    }

    pub fn with_min_output_bytes(mut self, bytes: u64) -> Self {
        self.min_output_bytes = bytes;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn has_cookies(&self) -> bool {
        self.cookies.is_some()
    }

    /// Full argument list, URL last behind `--` so it is never read as an option.
    pub fn build_args(&self, url: &str, mode: ExtractMode, cookie_path: Option<&Path>) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-playlist",
            "--force-ipv4",
            "--newline",
            "--progress",
            "--user-agent",
            USER_AGENT,
            "-P",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push(self.output_dir.to_string_lossy().into_owned());
        args.extend(
            ["-o", OUTPUT_TEMPLATE, "--print", "after_move:filepath"]
                .iter()
                .map(|s| s.to_string()),
        );

        match mode {
            ExtractMode::Audio => args.extend(
                ["--extract-audio", "--audio-format", "mp3", "--audio-quality", "0"]
                    .iter()
                    .map(|s| s.to_string()),
            ),
            ExtractMode::Video => args.extend(
                ["--merge-output-format", "mp4", "--format", VIDEO_FORMAT]
                    .iter()
                    .map(|s| s.to_string()),
            ),
        }

        if let Some(path) = cookie_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        if url.contains("tiktok.com") {
            args.push("--referer".to_string());
            args.push(TIKTOK_REFERER.to_string());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Write the cookie jar to a temp file that lives for one invocation.
    fn write_cookie_file(&self, tag: &str) -> MediaResult<Option<NamedTempFile>> {
        let Some(blob) = &self.cookies else {
            return Ok(None);
        };

        let mut file = tempfile::Builder::new()
            .prefix(&format!("cookies-{}-", tag))
            .suffix(".txt")
            .tempfile_in(&self.output_dir)?;
        file.write_all(blob.as_bytes())?;
        file.flush()?;
        Ok(Some(file))
    }

    /// Run yt-dlp for `url` and validate the produced file.
    ///
    /// `on_progress` receives every raw percentage the tool reports. `tag`
    /// namespaces the temporary cookie file.
    pub async fn extract<F>(
        &self,
        tag: &str,
        url: &str,
        mode: ExtractMode,
        mut on_progress: F,
    ) -> MediaResult<ExtractedFile>
    where
        F: FnMut(u8),
    {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let cookie_file = self.write_cookie_file(tag)?;
        let cmd = ToolCommand::new(&self.program).args(self.build_args(
            url,
            mode,
            cookie_file.as_ref().map(|f| f.path()),
        ));

        info!(url = %url, mode = ?mode, cookies = cookie_file.is_some(), "Starting extraction");

        let mut final_path: Option<PathBuf> = None;
        let outcome = ToolRunner::new()
            .run_with_lines(&cmd, |line| {
                let event = parse_line(line, &self.output_dir);
                if let Some(percent) = event.progress {
                    on_progress(percent);
                }
                if let Some(path) = event.path {
                    final_path = Some(path);
                }
            })
            .await;

        // Cookie jar is removed whether or not the tool succeeded.
        if let Some(file) = cookie_file {
            if let Err(e) = file.close() {
                warn!(error = %e, "Failed to remove temporary cookie file");
            }
        }

        let status = outcome?;
        if !status.success() {
            return Err(MediaError::tool_failed(cmd.name(), status.code()));
        }

        let path = final_path.ok_or_else(|| MediaError::download_failed("no output path reported"))?;
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(MediaError::FileNotFound(path)),
        };

        if size < self.min_output_bytes {
            warn!(
                path = %path.display(),
                size = size,
                min = self.min_output_bytes,
                "Extracted file too small, deleting"
            );
            tokio::fs::remove_file(&path).await?;
            return Err(MediaError::FileTooSmall {
                size,
                min: self.min_output_bytes,
            });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| MediaError::FileNotFound(path.clone()))?;
        debug!(path = %path.display(), size = size, "Extraction validated");

        Ok(ExtractedFile {
            content_type: content_type_for(&path),
            filename,
            size,
            path,
        })
    }
}

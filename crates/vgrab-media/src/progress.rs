//! Extractor output line protocol.
//!
//! yt-dlp run with `--newline --progress --print after_move:filepath`
//! writes one status line per progress tick and finally the path of the
//! produced file. Parsing is kept free of I/O so it can be tested without
//! spawning anything.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Media extensions accepted by the path heuristic.
const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mp3"];

/// Directory-name suffix accepted by the path heuristic.
const OUTPUT_DIR_SUFFIX: &str = "outputs";

static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d+(?:\.\d*)?)%").expect("static pattern is valid")
});

/// What a single stdout line told us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEvent {
    /// Download percentage, floored
    pub progress: Option<u8>,
    /// Candidate final file path
    pub path: Option<PathBuf>,
}

/// Parse one stdout line.
pub fn parse_line(line: &str, output_dir: &Path) -> LineEvent {
    LineEvent {
        progress: parse_progress(line),
        path: parse_output_path(line, output_dir),
    }
}

/// Extract the percentage from a `[download]  42.3% of ...` line.
///
/// Values above 100 are discarded.
pub fn parse_progress(line: &str) -> Option<u8> {
    let value: f64 = PERCENT.captures(line)?.get(1)?.as_str().parse().ok()?;
    let floored = value.floor();
    (floored <= 100.0).then_some(floored as u8)
}

/// Recognize a line naming the produced file.
///
/// A line qualifies when it is a path under `output_dir`, or a media file
/// whose parent directory name ends in `outputs`.
pub fn parse_output_path(line: &str, output_dir: &Path) -> Option<PathBuf> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('[') {
        return None;
    }

    let path = Path::new(line);
    if path.starts_with(output_dir) && path != output_dir {
        return Some(path.to_path_buf());
    }

    let is_media = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MEDIA_EXTENSIONS.contains(&e));
    let in_outputs = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(OUTPUT_DIR_SUFFIX));

    (is_media && in_outputs).then(|| path.to_path_buf())
}

/// Turns raw percentages into monotonic job progress.
///
/// With `halved`, extraction occupies 0..=50 so a second stage can fill the
/// rest.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: u8,
    halved: bool,
}

impl ProgressTracker {
    pub fn new(halved: bool) -> Self {
        Self { last: 0, halved }
    }

    /// Scaled value if it strictly exceeds everything seen so far.
    pub fn observe(&mut self, percent: u8) -> Option<u8> {
        let scaled = if self.halved { percent / 2 } else { percent };
        if scaled > self.last && scaled <= 100 {
            self.last = scaled;
            Some(scaled)
        } else {
            None
        }
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress() {
        assert_eq!(parse_progress("[download]  42.3% of 10.00MiB at 1.00MiB/s ETA 00:05"), Some(42));
        assert_eq!(parse_progress("[download] 100% of 10.00MiB in 00:10"), Some(100));
        assert_eq!(parse_progress("[download]   0.0% of ~5MiB"), Some(0));
        assert_eq!(parse_progress("[download] 99.9%"), Some(99));
        assert_eq!(parse_progress("[download] Destination: /out/x.mp4"), None);
        assert_eq!(parse_progress("[ExtractAudio] 50%"), None);
        assert_eq!(parse_progress("[download] 250%"), None);
    }

    #[test]
    fn test_parse_output_path_under_dir() {
        let dir = Path::new("/srv/vgrab/data");
        assert_eq!(
            parse_output_path("/srv/vgrab/data/dQw4w9WgXcQ.webm\n", dir),
            Some(PathBuf::from("/srv/vgrab/data/dQw4w9WgXcQ.webm"))
        );
        assert_eq!(parse_output_path("/srv/vgrab/data", dir), None);
        assert_eq!(parse_output_path("/srv/vgrab/other/x.webm", dir), None);
    }

    #[test]
    fn test_status_lines_are_not_paths() {
        let dir = Path::new("/srv/outputs");
        assert_eq!(parse_output_path("[download] Destination: /srv/outputs/x.mp4", dir), None);
        assert_eq!(parse_output_path("", dir), None);
    }

    #[test]
    fn test_parse_output_path_by_extension() {
        let dir = Path::new("/elsewhere");
        assert_eq!(
            parse_output_path("/app/outputs/abc.mp3", dir),
            Some(PathBuf::from("/app/outputs/abc.mp3"))
        );
        assert_eq!(parse_output_path("/app/outputs/abc.webm", dir), None);
        assert_eq!(parse_output_path("/app/media/abc.mp4", dir), None);
    }

    #[test]
    fn test_parse_line_combines_both() {
        let dir = Path::new("/out");
        let event = parse_line("[download]  12.5% of 3MiB", dir);
        assert_eq!(event.progress, Some(12));
        assert!(event.path.is_none());

        let event = parse_line("/out/v.mp4", dir);
        assert_eq!(event, LineEvent { progress: None, path: Some(PathBuf::from("/out/v.mp4")) });
    }

    #[test]
    fn test_tracker_is_strictly_increasing() {
        let mut tracker = ProgressTracker::new(false);
        let emitted: Vec<u8> = [0, 10, 10, 5, 60, 100]
            .into_iter()
            .filter_map(|p| tracker.observe(p))
            .collect();
        assert_eq!(emitted, vec![10, 60, 100]);
        assert_eq!(tracker.last(), 100);
    }

    #[test]
    fn test_tracker_halves_for_two_stage_jobs() {
        let mut tracker = ProgressTracker::new(true);
        assert_eq!(tracker.observe(1), None);
        assert_eq!(tracker.observe(40), Some(20));
        assert_eq!(tracker.observe(41), None);
        assert_eq!(tracker.observe(100), Some(50));
    }
}

//! Platform detection and URL normalization.
//!
//! Classifies an arbitrary user-pasted URL into one of the supported video
//! platforms, extracts the platform-native video identifier and rebuilds a
//! canonical URL for it.
//!
//! # Guarantees
//! - Pure and deterministic: no I/O, no panics on user input
//! - Every failure mode is encoded in the returned [`NormalizedResult`]
//! - Tracking parameters (`utm_*`, `fbclid`, `igshid`) never survive into
//!   `normalized_url`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Types
// ============================================================================

/// Supported source platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Twitter,
    Facebook,
    Vimeo,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Vimeo => "vimeo",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying and canonicalizing a URL.
///
/// Invariant: `id.is_some()` implies `platform != Unknown` implies `is_valid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    /// Detected platform
    pub platform: Platform,
    /// Canonical form of the URL
    pub normalized_url: String,
    /// False only for unparsable input or non-http(s) schemes
    pub is_valid: bool,
    /// Diagnostic, present iff no platform-native id was extracted
    pub reason: Option<String>,
    /// Platform-native video identifier
    pub id: Option<String>,
}

impl NormalizedResult {
    fn invalid(normalized_url: String, reason: impl Into<String>) -> Self {
        Self {
            platform: Platform::Unknown,
            normalized_url,
            is_valid: false,
            reason: Some(reason.into()),
            id: None,
        }
    }
}

/// Reason attached to unparsable input.
pub const REASON_INVALID_FORMAT: &str = "Invalid URL format";
/// Reason attached to URLs on hosts no detector claims.
pub const REASON_UNRECOGNIZED: &str = "Platform not recognized";
/// Reason attached to recognized hosts whose path carries no video id.
pub const REASON_NO_ID: &str = "Video ID not found in URL";

const TRACKING_PARAMS: &[&str] = &["fbclid", "igshid"];

// ============================================================================
// Detectors
// ============================================================================

/// Identifier plus the canonical URL rebuilt around it.
struct VideoRef {
    id: String,
    canonical: String,
}

struct Detector {
    platform: Platform,
    /// Hostnames with any `www.` prefix removed
    hosts: &'static [&'static str],
    /// Host substituted into the cleaned URL when no id matched
    rewrite_host: Option<&'static str>,
    extract: fn(&Url, &str) -> Option<VideoRef>,
}

/// Fixed detector order. Hosts are disjoint, so order only fixes determinism.
const DETECTORS: &[Detector] = &[
    Detector {
        platform: Platform::Youtube,
        hosts: &["youtube.com", "m.youtube.com", "youtu.be"],
        rewrite_host: None,
        extract: extract_youtube,
    },
    Detector {
        platform: Platform::Tiktok,
        hosts: &["tiktok.com", "vm.tiktok.com", "m.tiktok.com"],
        rewrite_host: None,
        extract: extract_tiktok,
    },
    Detector {
        platform: Platform::Instagram,
        hosts: &["instagram.com", "instagr.am"],
        rewrite_host: None,
        extract: extract_instagram,
    },
    Detector {
        platform: Platform::Twitter,
        hosts: &["twitter.com", "x.com", "mobile.twitter.com"],
        rewrite_host: Some("x.com"),
        extract: extract_twitter,
    },
    Detector {
        platform: Platform::Facebook,
        hosts: &["facebook.com", "m.facebook.com", "fb.com", "fb.watch"],
        rewrite_host: None,
        extract: extract_facebook,
    },
    Detector {
        platform: Platform::Vimeo,
        hosts: &["vimeo.com", "player.vimeo.com"],
        rewrite_host: None,
        extract: extract_vimeo,
    },
];

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("static pattern is valid"));
static YOUTUBE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static pattern is valid"));
static NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("static pattern is valid"));
static TIKTOK_VIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/@([\w.]+)/video/(\d+)").expect("static pattern is valid"));
static INSTAGRAM_POST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(p|reel|tv)/([A-Za-z0-9_-]+)").expect("static pattern is valid"));
static TWITTER_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\w+)/status/(\d+)").expect("static pattern is valid"));
static FACEBOOK_REEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/reel/(\d+)").expect("static pattern is valid"));
static FACEBOOK_VIDEOS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/videos/(\d+)").expect("static pattern is valid"));
static VIMEO_PLAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/video/(\d+)").expect("static pattern is valid"));
static VIMEO_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+)").expect("static pattern is valid"));

/// First path segment after `prefix`, if non-empty.
fn segment_after<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.split('/').next())
        .filter(|s| !s.is_empty())
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn extract_youtube(url: &Url, host: &str) -> Option<VideoRef> {
    let path = url.path();

    // Priority: short link, watch, embed, /v/, shorts. First hit wins.
    let short = (host == "youtu.be")
        .then(|| segment_after(path, "/").map(str::to_string))
        .flatten();

    // Ids are restricted to the URL-safe alphabet so the canonical
    // query string reparses to the same id.
    let id = short
        .or_else(|| (path == "/watch").then(|| query_value(url, "v")).flatten())
        .or_else(|| segment_after(path, "/embed/").map(str::to_string))
        .or_else(|| segment_after(path, "/v/").map(str::to_string))
        .or_else(|| segment_after(path, "/shorts/").map(str::to_string))
        .filter(|id| YOUTUBE_ID.is_match(id))?;

    Some(VideoRef {
        canonical: format!("https://www.youtube.com/watch?v={}", id),
        id,
    })
}

fn extract_tiktok(url: &Url, _host: &str) -> Option<VideoRef> {
    let caps = TIKTOK_VIDEO.captures(url.path())?;
    let (user, id) = (&caps[1], &caps[2]);

    Some(VideoRef {
        canonical: format!("https://www.tiktok.com/@{}/video/{}", user, id),
        id: id.to_string(),
    })
}

fn extract_instagram(url: &Url, _host: &str) -> Option<VideoRef> {
    let caps = INSTAGRAM_POST.captures(url.path())?;
    let (kind, code) = (&caps[1], &caps[2]);

    Some(VideoRef {
        canonical: format!("https://www.instagram.com/{}/{}/", kind, code),
        id: code.to_string(),
    })
}

fn extract_twitter(url: &Url, _host: &str) -> Option<VideoRef> {
    let caps = TWITTER_STATUS.captures(url.path())?;
    let (user, id) = (&caps[1], &caps[2]);

    Some(VideoRef {
        canonical: format!("https://x.com/{}/status/{}", user, id),
        id: id.to_string(),
    })
}

fn extract_facebook(url: &Url, _host: &str) -> Option<VideoRef> {
    let path = url.path();

    // Priority: reel, /videos/, watch, video.php. Later shapes never
    // overwrite an id found by an earlier one.
    let id = FACEBOOK_REEL
        .captures(path)
        .map(|c| c[1].to_string())
        .or_else(|| FACEBOOK_VIDEOS.captures(path).map(|c| c[1].to_string()))
        .or_else(|| {
            matches!(path, "/watch" | "/watch/")
                .then(|| query_value(url, "v"))
                .flatten()
        })
        .or_else(|| (path == "/video.php").then(|| query_value(url, "v")).flatten())
        .filter(|id| NUMERIC_ID.is_match(id))?;

    Some(VideoRef {
        canonical: format!("https://www.facebook.com/video.php?v={}", id),
        id,
    })
}

fn extract_vimeo(url: &Url, _host: &str) -> Option<VideoRef> {
    let path = url.path();

    let id = VIMEO_PLAYER
        .captures(path)
        .or_else(|| VIMEO_PLAIN.captures(path))
        .map(|c| c[1].to_string())?;

    Some(VideoRef {
        canonical: format!("https://vimeo.com/{}", id),
        id,
    })
}

// ============================================================================
// Normalization
// ============================================================================

/// Lower-case a host and drop a leading `www.`.
fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Remove tracking parameters in place, preserving the order of the rest.
pub fn strip_tracking_params(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

fn has_scheme(raw: &str) -> bool {
    SCHEME.is_match(raw)
}

/// Clean a URL that has no extractable id: strip tracking, force https.
fn cleaned(mut url: Url, rewrite_host: Option<&str>) -> String {
    strip_tracking_params(&mut url);
    if url.scheme() != "https" {
        url.set_scheme("https").ok();
    }
    if let Some(host) = rewrite_host {
        url.set_host(Some(host)).ok();
    }
    url.to_string()
}

/// Classify a raw URL and produce its canonical form.
///
/// # Example
/// ```
/// use vgrab_models::platform::{normalize, Platform};
///
/// let result = normalize("youtu.be/dQw4w9WgXcQ?utm_source=share");
/// assert_eq!(result.platform, Platform::Youtube);
/// assert_eq!(result.id.as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(result.normalized_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
/// ```
pub fn normalize(raw: &str) -> NormalizedResult {
    let trimmed = raw.trim();

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(_) => return NormalizedResult::invalid(String::new(), REASON_INVALID_FORMAT),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        let reason = format!("Invalid protocol: {}:", url.scheme());
        strip_tracking_params(&mut url);
        return NormalizedResult::invalid(url.to_string(), reason);
    }

    let host = match url.host_str() {
        Some(host) => normalize_host(host),
        None => return NormalizedResult::invalid(String::new(), REASON_INVALID_FORMAT),
    };

    for detector in DETECTORS {
        if !detector.hosts.contains(&host.as_str()) {
            continue;
        }

        return match (detector.extract)(&url, &host) {
            Some(video) => NormalizedResult {
                platform: detector.platform,
                normalized_url: video.canonical,
                is_valid: true,
                reason: None,
                id: Some(video.id),
            },
            None => NormalizedResult {
                platform: detector.platform,
                normalized_url: cleaned(url, detector.rewrite_host),
                is_valid: true,
                reason: Some(REASON_NO_ID.to_string()),
                id: None,
            },
        };
    }

    NormalizedResult {
        platform: Platform::Unknown,
        normalized_url: cleaned(url, None),
        is_valid: true,
        reason: Some(REASON_UNRECOGNIZED.to_string()),
        id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_id(raw: &str, platform: Platform, id: &str, normalized: &str) {
        let result = normalize(raw);
        assert_eq!(result.platform, platform, "platform for {}", raw);
        assert_eq!(result.id.as_deref(), Some(id), "id for {}", raw);
        assert_eq!(result.normalized_url, normalized, "normalized for {}", raw);
        assert!(result.is_valid);
        assert!(result.reason.is_none());
    }

    // ========================================================================
    // YouTube
    // ========================================================================

    #[test]
    fn test_youtube_watch_url() {
        assert_id(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Platform::Youtube,
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        );
    }

    #[test]
    fn test_youtube_shapes() {
        let canonical = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        for raw in [
            "https://youtu.be/dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&utm_source=twitter",
            "  https://YOUTUBE.COM/watch?v=dQw4w9WgXcQ&list=PL123&t=30  ",
        ] {
            assert_id(raw, Platform::Youtube, "dQw4w9WgXcQ", canonical);
        }
    }

    #[test]
    fn test_youtube_without_id_keeps_cleaned_url() {
        let result = normalize("http://www.youtube.com/@channel?utm_campaign=x&sort=new");
        assert_eq!(result.platform, Platform::Youtube);
        assert!(result.is_valid);
        assert!(result.id.is_none());
        assert_eq!(result.reason.as_deref(), Some(REASON_NO_ID));
        assert_eq!(result.normalized_url, "https://www.youtube.com/@channel?sort=new");
    }

    #[test]
    fn test_youtube_empty_watch_param_has_no_id() {
        let result = normalize("https://www.youtube.com/watch?v=");
        assert_eq!(result.platform, Platform::Youtube);
        assert!(result.id.is_none());
    }

    // ========================================================================
    // Other platforms
    // ========================================================================

    #[test]
    fn test_tiktok_video() {
        assert_id(
            "https://www.tiktok.com/@user.name/video/7123456789012345678?is_from_webapp=1",
            Platform::Tiktok,
            "7123456789012345678",
            "https://www.tiktok.com/@user.name/video/7123456789012345678",
        );
    }

    #[test]
    fn test_tiktok_short_link_has_no_id() {
        let result = normalize("https://vm.tiktok.com/ZM8abc123/");
        assert_eq!(result.platform, Platform::Tiktok);
        assert!(result.id.is_none());
        assert_eq!(result.normalized_url, "https://vm.tiktok.com/ZM8abc123/");
    }

    #[test]
    fn test_instagram_shapes() {
        assert_id(
            "https://www.instagram.com/p/ABC123xyz/",
            Platform::Instagram,
            "ABC123xyz",
            "https://www.instagram.com/p/ABC123xyz/",
        );
        assert_id(
            "https://instagram.com/tv/GHI789/?igshid=abc123",
            Platform::Instagram,
            "GHI789",
            "https://www.instagram.com/tv/GHI789/",
        );
        assert_id(
            "instagram.com/reel/DEF456",
            Platform::Instagram,
            "DEF456",
            "https://www.instagram.com/reel/DEF456/",
        );
    }

    #[test]
    fn test_twitter_status() {
        assert_id(
            "https://x.com/user/status/1234567890",
            Platform::Twitter,
            "1234567890",
            "https://x.com/user/status/1234567890",
        );
        assert_id(
            "https://mobile.twitter.com/someone/status/123?s=20",
            Platform::Twitter,
            "123",
            "https://x.com/someone/status/123",
        );
    }

    #[test]
    fn test_twitter_without_status_rewrites_host() {
        let result = normalize("https://twitter.com/someone?fbclid=abc");
        assert_eq!(result.platform, Platform::Twitter);
        assert!(result.id.is_none());
        assert_eq!(result.normalized_url, "https://x.com/someone");
    }

    #[test]
    fn test_facebook_shapes() {
        let canonical = |id: &str| format!("https://www.facebook.com/video.php?v={}", id);
        assert_id(
            "https://www.facebook.com/watch?v=123456789",
            Platform::Facebook,
            "123456789",
            &canonical("123456789"),
        );
        assert_id(
            "https://facebook.com/page/videos/987654321",
            Platform::Facebook,
            "987654321",
            &canonical("987654321"),
        );
        assert_id(
            "https://www.facebook.com/reel/111222333?fbclid=xyz",
            Platform::Facebook,
            "111222333",
            &canonical("111222333"),
        );
        assert_id(
            "https://m.facebook.com/video.php?v=42",
            Platform::Facebook,
            "42",
            &canonical("42"),
        );
    }

    #[test]
    fn test_facebook_earlier_pattern_wins() {
        // A reel path that also carries videos/ keeps the reel id.
        let result = normalize("https://www.facebook.com/reel/111/videos/222");
        assert_eq!(result.id.as_deref(), Some("111"));
    }

    #[test]
    fn test_facebook_short_link_has_no_id() {
        let result = normalize("https://fb.watch/abc123/");
        assert_eq!(result.platform, Platform::Facebook);
        assert!(result.id.is_none());
    }

    #[test]
    fn test_vimeo_shapes() {
        assert_id(
            "https://vimeo.com/123456789",
            Platform::Vimeo,
            "123456789",
            "https://vimeo.com/123456789",
        );
        assert_id(
            "https://player.vimeo.com/video/123456789?h=abc",
            Platform::Vimeo,
            "123456789",
            "https://vimeo.com/123456789",
        );
    }

    // ========================================================================
    // Invalid and unknown input
    // ========================================================================

    #[test]
    fn test_not_a_url() {
        let result = normalize("not a url");
        assert_eq!(result.platform, Platform::Unknown);
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(REASON_INVALID_FORMAT));
        assert!(result.id.is_none());
    }

    #[test]
    fn test_empty_input_is_invalid() {
        let result = normalize("   ");
        assert!(!result.is_valid);
        assert_eq!(result.platform, Platform::Unknown);
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let result = normalize("ftp://youtube.com/watch?v=dQw4w9WgXcQ&utm_source=x");
        assert_eq!(result.platform, Platform::Unknown);
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("Invalid protocol: ftp:"));
        assert!(!result.normalized_url.contains("utm_source"));
    }

    #[test]
    fn test_unknown_platform() {
        let result = normalize("https://dailymotion.com/video/x8abc");
        assert_eq!(result.platform, Platform::Unknown);
        assert!(result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(REASON_UNRECOGNIZED));
        assert_eq!(result.normalized_url, "https://dailymotion.com/video/x8abc");
    }

    #[test]
    fn test_lookalike_host_is_not_youtube() {
        let result = normalize("https://notyoutube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(result.platform, Platform::Unknown);
    }

    // ========================================================================
    // Properties
    // ========================================================================

    const SAMPLES: &[&str] = &[
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&utm_source=a",
        "youtu.be/dQw4w9WgXcQ",
        "https://www.tiktok.com/@creator/video/1234567890?utm_medium=b",
        "https://vm.tiktok.com/ZM8abc123/?utm_term=c",
        "https://instagram.com/tv/GHI789/?igshid=abc123",
        "x.com/user/status/999",
        "https://facebook.com/page/videos/987654321?fbclid=z",
        "https://www.facebook.com/groups/foo?fbclid=z&utm_content=q",
        "https://player.vimeo.com/video/123456789",
        "https://example.com/path?utm_source=news&id=7&utm_custom=1",
        "ftp://example.com/?fbclid=1",
    ];

    #[test]
    fn test_tracking_params_never_survive() {
        for raw in SAMPLES {
            let result = normalize(raw);
            let normalized = &result.normalized_url;
            assert!(!normalized.contains("utm_"), "{} -> {}", raw, normalized);
            assert!(!normalized.contains("fbclid"), "{} -> {}", raw, normalized);
            assert!(!normalized.contains("igshid"), "{} -> {}", raw, normalized);
        }
    }

    #[test]
    fn test_normalization_is_idempotent_for_ids() {
        for raw in SAMPLES {
            let first = normalize(raw);
            if first.id.is_none() {
                continue;
            }
            let second = normalize(&first.normalized_url);
            assert_eq!(second.id, first.id, "{}", raw);
            assert_eq!(second.platform, first.platform, "{}", raw);
        }
    }

    #[test]
    fn test_percent_encoded_ids_are_not_extracted() {
        for raw in [
            "https://www.youtube.com/watch?v=abc%26list%3D1",
            "https://youtu.be/abc%20def",
            "https://www.facebook.com/video.php?v=12%2334",
        ] {
            let first = normalize(raw);
            assert!(first.is_valid, "{}", raw);
            assert_eq!(first.id, None, "{}", raw);
            assert_eq!(first.reason.as_deref(), Some(REASON_NO_ID), "{}", raw);

            let second = normalize(&first.normalized_url);
            assert_eq!(second.id, first.id, "{}", raw);
            assert_eq!(second.normalized_url, first.normalized_url, "{}", raw);
        }
    }

    #[test]
    fn test_id_implies_known_platform_and_valid() {
        for raw in SAMPLES {
            let result = normalize(raw);
            if result.id.is_some() {
                assert_ne!(result.platform, Platform::Unknown);
                assert!(result.is_valid);
            }
            assert_eq!(result.reason.is_some(), result.id.is_none(), "{}", raw);
        }
    }

    #[test]
    fn test_unknown_keeps_non_tracking_params_in_order() {
        let result = normalize("https://example.com/path?utm_source=news&id=7&utm_custom=1&b=2");
        assert_eq!(result.normalized_url, "https://example.com/path?id=7&b=2");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(normalize("https://vimeo.com/1")).unwrap();
        assert_eq!(json["platform"], "vimeo");
        assert_eq!(json["normalizedUrl"], "https://vimeo.com/1");
        assert_eq!(json["isValid"], true);
        assert_eq!(json["id"], "1");
        assert!(json["reason"].is_null());
    }
}

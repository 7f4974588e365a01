//! Heuristic transcript summary.
//!
//! No model is involved: the summary is cut from the transcript itself.

use vgrab_models::Summary;

/// Sentences in the short overview.
const SHORT_SENTENCES: usize = 3;
/// Sentences considered for key takeaways, after the overview.
const TAKEAWAY_SENTENCES: usize = 5;
/// Takeaways must be longer than this many characters.
const MIN_TAKEAWAY_CHARS: usize = 20;
/// Character cap of the medium summary.
const MEDIUM_CHARS: usize = 1500;
/// Character cap of the transcript preview in results.
pub const PREVIEW_CHARS: usize = 2000;

/// Split on `.`, `?` or `!` followed by optional whitespace and a capital.
///
/// Punctuation stays with its sentence; the whitespace is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        pos += c.len_utf8();
        if !matches!(c, '.' | '?' | '!') {
            continue;
        }

        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with(|next: char| next.is_ascii_uppercase()) {
            sentences.push(&text[start..pos]);
            pos += rest.len() - trimmed.len();
            start = pos;
        }
    }

    sentences.push(&text[start..]);
    sentences
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Derive a summary from a transcript.
pub fn summarize(text: &str) -> Summary {
    let sentences = split_sentences(text);

    let short_summary = sentences
        .iter()
        .take(SHORT_SENTENCES)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let key_takeaways = sentences
        .iter()
        .skip(SHORT_SENTENCES)
        .take(TAKEAWAY_SENTENCES)
        .map(|s| s.trim())
        .filter(|s| s.chars().count() > MIN_TAKEAWAY_CHARS)
        .map(str::to_string)
        .collect();

    let head = truncate_chars(text, MEDIUM_CHARS);
    let medium_summary = if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    };

    Summary {
        short_summary,
        key_takeaways,
        medium_summary,
    }
}

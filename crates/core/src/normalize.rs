//! Line cleaning and noise detection.
//!
//! Vision and chat replies arrive wrapped in markdown: emphasis, bullets,
//! headings, code fences and a chatty preamble ("Here is your list:").
//! This module strips the decoration and flags lines that carry no item.

/// Substrings that mark a line as meta-commentary rather than an item.
const META_PHRASES: &[&str] = &["here", "list"];

fn is_bullet(c: char) -> bool {
    matches!(c, '-' | '+' | '•' | '·' | '–' | '—')
}

/// Remove emphasis markers and leading bullet/dash markers, then trim.
pub fn clean_line(raw: &str) -> String {
    let without_emphasis = raw.replace('*', "");
    without_emphasis
        .trim()
        .trim_start_matches(|c: char| is_bullet(c) || c.is_whitespace())
        .trim_end()
        .to_string()
}

/// Whether an already-cleaned line should be skipped.
///
/// Noise is an empty line, a heading, a code fence, or meta-commentary:
/// anything mentioning "here" or "list", or "item" followed by a colon.
pub fn is_noise(cleaned: &str) -> bool {
    if cleaned.is_empty() || cleaned.starts_with('#') || cleaned.contains("```") {
        return true;
    }
    let lower = cleaned.to_lowercase();
    if META_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    lower.contains("item") && cleaned.contains(':')
}

/// Clean a raw line and drop it if it is noise.
pub fn normalize_line(raw: &str) -> Option<String> {
    let cleaned = clean_line(raw);
    if is_noise(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

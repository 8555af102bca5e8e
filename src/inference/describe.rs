//! Description synthesis from prose
//!
//! Used by the local strategy to describe modules and submodules, and by
//! post-processing to fill and bound descriptions from any strategy.

use regex::Regex;
use std::sync::LazyLock;

/// Sentence boundary: terminal punctuation followed by whitespace
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]\s+").expect("BUG: hardcoded sentence regex is invalid")
});

/// Fragments shorter than this are not treated as sentences
const MIN_SENTENCE_CHARS: usize = 10;

/// Words kept when no usable sentence is found
const FALLBACK_WORDS: usize = 20;

/// Placeholder for a name with no descriptive text
pub fn placeholder(name: &str) -> String {
    format!("Details about {}", name)
}

/// Splits prose into sentences, punctuation kept
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // Keep the punctuation, drop the whitespace
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Builds a description of at most `max_sentences` sentences and
/// `max_chars` characters from `prose`
///
/// Sentences shorter than ten characters or equal to `title` are skipped.
/// Falls back to the first twenty words of the prose, then to None when
/// there is no prose at all.
pub fn describe(prose: &str, title: &str, max_sentences: usize, max_chars: usize) -> Option<String> {
    let clean = prose.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    let mut length = 0;

    for sentence in sentences(&clean) {
        let chars = sentence.chars().count();
        if chars < MIN_SENTENCE_CHARS || sentence.eq_ignore_ascii_case(title.trim()) {
            continue;
        }
        // +1 for the joining space
        if length + chars + 1 <= max_chars {
            parts.push(sentence);
            length += chars + 1;
            if parts.len() >= max_sentences {
                break;
            }
        }
    }

    if parts.is_empty() {
        let words: Vec<&str> = clean.split(' ').take(FALLBACK_WORDS).collect();
        return Some(truncate_at_word(&words.join(" "), max_chars));
    }

    Some(parts.join(" "))
}

/// Cuts `text` to at most `max_chars` characters at a word boundary
///
/// A single word longer than the limit is cut mid-word.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let next_is_break = text
        .chars()
        .nth(max_chars)
        .is_some_and(char::is_whitespace);

    if next_is_break {
        return cut.trim_end().to_string();
    }

    match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}

//! Text normalisation shared by the taxonomy matcher and the resume heuristics.
//!
//! Every piece of text that is compared against something else (aliases, resume
//! bodies, job descriptions) goes through [`normalize`] first so that offsets
//! and comparisons are made over the same representation.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Words that carry no signal for lexical overlap.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "being", "but", "by", "can", "could", "did", "do", "does", "during", "each",
    "etc", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "may", "me", "more", "most", "my", "must", "no", "not", "of",
    "on", "or", "our", "out", "over", "per", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to",
    "up", "us", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "within", "would", "you", "your",
];

/// NFKC, lowercase, whitespace runs collapsed to a single space, trimmed.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    let mut out = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Characters that glue a word together for boundary checks.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Splits already-normalised text into alphanumeric word tokens with their byte offsets.
pub fn word_spans(normalized: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in normalized.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, normalized.len()));
    }
    spans
}

/// Distinct content-bearing terms of `text`.
///
/// Stop-words, single-character tokens and purely numeric tokens are dropped.
pub fn content_terms(text: &str) -> BTreeSet<String> {
    let normalized = normalize(text);
    word_spans(&normalized)
        .into_iter()
        .map(|(s, e)| &normalized[s..e])
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !t.chars().all(|c| c.is_numeric()))
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Stable content identity of a resume body: SHA-256 over the normalised text.
///
/// Returns `None` for text that is empty after normalisation, since blank
/// resumes from different candidates are not the same document.
pub fn content_fingerprint(text: &str) -> Option<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }
    Some(format!("{:x}", Sha256::digest(normalized.as_bytes())))
}

/// Splits raw text into candidate statements: lines, bullets and sentences.
pub fn statements(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, '\n' | '\r' | '•' | '●' | '▪' | '◦' | ';'))
        .flat_map(|line| line.split(". "))
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect()
}

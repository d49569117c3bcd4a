//! Text similarity primitives shared by deduplication and keyword search.
//!
//! Both the aggregator's fuzzy matching and the query engine's keyword
//! filter tokenize text the same way, so an observation that merges with
//! another is also findable by the same words.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Word characters only; punctuation and whitespace act as separators.
static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Minimum token length kept by the tokenizer. Shorter tokens (articles,
/// single letters, most operators) carry no matching signal.
const MIN_TOKEN_LEN: usize = 3;

/// Tokenize text for similarity comparison.
///
/// Lowercases, strips punctuation, collapses whitespace, and drops tokens
/// shorter than three characters.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

/// Jaccard similarity between two token sets.
///
/// Two empty sets are identical (1.0); an empty set against a non-empty one
/// shares nothing (0.0).
pub fn jaccard_of_sets(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

/// Jaccard similarity between two texts.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    jaccard_of_sets(&tokenize(a), &tokenize(b))
}

/// Whether a keyword shares at least one token with the given text or tags.
///
/// A keyword that tokenizes to nothing matches nothing.
pub fn matches_keyword(text: &str, tags: &[String], keyword: &str) -> bool {
    let needle = tokenize(keyword);
    if needle.is_empty() {
        return false;
    }

    let mut haystack = tokenize(text);
    for tag in tags {
        haystack.extend(tokenize(tag));
    }

    needle.iter().any(|t| haystack.contains(t))
}

//! Deterministic text cleaning applied before any comparison

use std::collections::BTreeSet;

/// Keep ASCII letters, digits and whitespace; lower-case the rest.
///
/// Pure and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized, whitespace-collapsed form used for equality comparisons
pub fn canonical(text: &str) -> String {
    collapse_whitespace(&normalize(text))
}

/// Split a delimited text into a set of canonical tokens.
///
/// Items are separated by `;`, `,`, `|` or newlines, matching how profile exports
/// join multi-valued columns. Empty items are dropped.
pub fn token_set(text: &str) -> BTreeSet<String> {
    text.split([';', ',', '|', '\n'])
        .map(canonical)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Canonical tokens for a list of items, one token per item
pub fn list_token_set(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| token_set(item))
        .collect()
}

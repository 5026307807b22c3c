//! Query variants tried during resolution.

use std::sync::LazyLock;

use regex::Regex;

static ACRONYM_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,10}$").expect("acronym pattern should compile"));

/// Derive an acronym search term from a query.
///
/// A query that already looks like an acronym is returned uppercased. A
/// multi-word query yields the initials of its alphabetic words longer than
/// two characters, kept only when 2 to 10 letters long.
pub fn derive_acronym(query: &str) -> Option<String> {
    let upper = query.to_uppercase();
    if ACRONYM_SHAPE.is_match(&upper) {
        return Some(upper);
    }

    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    let acronym: String = words
        .iter()
        .filter(|w| w.chars().all(char::is_alphabetic) && w.chars().count() > 2)
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    let len = acronym.chars().count();
    if (2..=10).contains(&len) {
        Some(acronym)
    } else {
        None
    }
}

/// Expand an acronym into a full project name.
///
/// No expansion source exists yet, so this never produces a variant.
pub fn expand_acronym(_query: &str) -> Option<String> {
    None
}

/// Ordered, de-duplicated search terms for a query: the raw query, the
/// quoted query, a derived acronym and an acronym expansion.
pub fn query_variants(query: &str) -> Vec<String> {
    let candidates = [
        Some(query.to_string()),
        Some(format!("\"{}\"", query)),
        derive_acronym(query),
        expand_acronym(query),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for variant in candidates.into_iter().flatten() {
        if variant.trim().is_empty() || variants.contains(&variant) {
            continue;
        }
        variants.push(variant);
    }
    variants
}

//! Candidate scoring.
//!
//! A weighted blend of three string similarities between the query and the
//! candidate title, plus bonuses for description hits, acronym matches and
//! exact title matches. The raw sum is capped at 1.0.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CandidateRecord, MatchType};

const WHOLE_WEIGHT: f64 = 0.4;
const PARTIAL_WEIGHT: f64 = 0.3;
const TOKEN_SET_WEIGHT: f64 = 0.2;

const DESCRIPTION_PHRASE_BONUS: f64 = 0.10;
const DESCRIPTION_WORD_BONUS: f64 = 0.05;
const ACRONYM_BONUS: f64 = 0.20;
const EXACT_BONUS: f64 = 0.30;

/// Significant title words: alphabetic runs of three or more letters.
static SIGNIFICANT_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z]{3,}").expect("significant word pattern should compile")
});

/// Lowercase, replace every non-word character with a space and collapse
/// whitespace.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length of the longest common subsequence of two character slices.
fn common_subsequence_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(row[j])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// `2 * matches / (len_a + len_b)`, rounded to a whole percent.
fn char_ratio(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matches = common_subsequence_len(a, b) as f64;
    let raw = 2.0 * matches / (a.len() + b.len()) as f64;
    (raw * 100.0).round() / 100.0
}

/// Whole-string similarity in `[0, 1]`, in whole-percent steps. Anything
/// involving an empty string is 0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    char_ratio(&a, &b)
}

/// Best similarity of the shorter string against every equal-length window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        best = best.max(char_ratio(&short, window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// Token-set similarity: compare the shared sorted tokens against each side
/// extended with its own remainder, keeping the best pairing.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let base = shared.join(" ");
    let join = |rest: &[&str]| {
        if base.is_empty() {
            rest.join(" ")
        } else {
            format!("{} {}", base, rest.join(" "))
        }
    };
    let combined_a = join(&only_a);
    let combined_b = join(&only_b);

    ratio(&base, &combined_a)
        .max(ratio(&base, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Acronym built from the first letters of the title's significant words,
/// or `None` when the title has fewer than two such words.
pub fn title_acronym(title: &str) -> Option<String> {
    let letters: String = SIGNIFICANT_WORD
        .find_iter(title)
        .filter_map(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if letters.len() < 2 {
        None
    } else {
        Some(letters)
    }
}

/// The uppercased, trimmed query equals the title's acronym.
pub fn is_acronym_match(query: &str, title: &str) -> bool {
    let query = query.trim().to_uppercase();
    !query.is_empty() && title_acronym(title).is_some_and(|acronym| acronym == query)
}

fn description_bonus(query_norm: &str, description: &str) -> f64 {
    if query_norm.is_empty() {
        return 0.0;
    }
    let desc_norm = normalize(description);
    if desc_norm.contains(query_norm) {
        DESCRIPTION_PHRASE_BONUS
    } else if query_norm
        .split(' ')
        .any(|word| word.chars().count() > 3 && desc_norm.contains(word))
    {
        DESCRIPTION_WORD_BONUS
    } else {
        0.0
    }
}

/// A score and the strongest signal behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub match_type: MatchType,
}

/// Score a candidate against the original query.
pub fn evaluate(query: &str, candidate: &CandidateRecord) -> Score {
    let query_norm = normalize(query);
    let title_norm = normalize(&candidate.title);

    let exact = !query_norm.is_empty() && query_norm == title_norm;
    let acronym = is_acronym_match(query, &candidate.title);

    let mut total = ratio(&query_norm, &title_norm) * WHOLE_WEIGHT
        + partial_ratio(&query_norm, &title_norm) * PARTIAL_WEIGHT
        + token_set_ratio(&query_norm, &title_norm) * TOKEN_SET_WEIGHT
        + description_bonus(&query_norm, &candidate.description);

    if acronym {
        total += ACRONYM_BONUS;
    }
    if exact {
        total += EXACT_BONUS;
    }

    let match_type = if exact {
        MatchType::ExactTitle
    } else if acronym {
        MatchType::Acronym
    } else {
        MatchType::Fuzzy
    };

    Score {
        value: total.clamp(0.0, 1.0),
        match_type,
    }
}

/// Score in `[0, 1]`.
pub fn score(query: &str, candidate: &CandidateRecord) -> f64 {
    evaluate(query, candidate).value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, description: &str) -> CandidateRecord {
        CandidateRecord::new("1", title, description, "https://cordis.europa.eu/project/id/1")
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("  ACME-X: Test!!  Case_1 "), "acme x test case_1");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn ratios_of_empty_strings_are_zero() {
        assert_eq!(ratio("", ""), 0.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
        assert_eq!(token_set_ratio("", "abc"), 0.0);
    }

    #[test]
    fn ratio_counts_matching_characters() {
        assert_eq!(ratio("solar grid", "solar grids"), 0.95);
        assert_eq!(ratio("abcd", "abce"), 0.75);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("exascale", "exascale"), 1.0);
    }

    #[test]
    fn one_letter_plural_still_auto_accepts() {
        let s = score("Solar Grid", &candidate("Solar Grids", "solar energy"));
        assert!((s - 0.92).abs() < 1e-9, "score was {}", s);
        assert!(s > 0.90);
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("exascale", "advanced exascale platform"), 1.0);
        assert!(partial_ratio("exascall", "advanced exascale platform") < 1.0);
    }

    #[test]
    fn token_set_ignores_order_and_extras() {
        assert_eq!(token_set_ratio("platform exascale", "exascale platform"), 1.0);
        assert_eq!(token_set_ratio("exascale", "exascale platform"), 1.0);
        assert_eq!(token_set_ratio("zzzz", "exascale platform"), 0.0);
    }

    #[test]
    fn exact_title_saturates() {
        let s = evaluate("ACME Exascale", &candidate("acme exascale", ""));
        assert_eq!(s.value, 1.0);
        assert_eq!(s.match_type, MatchType::ExactTitle);
    }

    #[test]
    fn exact_title_with_description_hit_still_caps_at_one() {
        let s = evaluate(
            "ACME Exascale",
            &candidate("acme exascale", "The ACME Exascale project builds platforms."),
        );
        assert_eq!(s.value, 1.0);
        assert_eq!(s.match_type, MatchType::ExactTitle);
    }

    #[test]
    fn acronym_bonus_applies() {
        let title = "Advanced Exascale Platform";
        assert!(is_acronym_match("aep", title));
        assert!(!is_acronym_match("AE", title));

        let s = evaluate("AEP", &candidate(title, ""));
        assert_eq!(s.match_type, MatchType::Acronym);
        assert!(s.value >= ACRONYM_BONUS);
    }

    #[test]
    fn acronym_needs_two_significant_words() {
        assert_eq!(title_acronym("Exascale"), None);
        assert_eq!(title_acronym("An Exascale of Platforms"), Some("EP".to_string()));
        assert!(!is_acronym_match("E", "Exascale"));
    }

    #[test]
    fn description_bonus_levels() {
        let phrase = score("exascale computing", &candidate("Other", "Work on exascale computing."));
        let word = score("exascale computing", &candidate("Other", "An exascale effort."));
        let none = score("exascale computing", &candidate("Other", "Unrelated."));
        assert!((phrase - none - DESCRIPTION_PHRASE_BONUS).abs() < 1e-9);
        assert!((word - none - DESCRIPTION_WORD_BONUS).abs() < 1e-9);
    }

    #[test]
    fn unrelated_scores_low() {
        let s = score("zzzz", &candidate("Advanced Exascale Platform", ""));
        assert!(s < 0.2, "score was {}", s);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let pairs = [
            ("ACME", "ACME Clean Mobility Energy"),
            ("", "Anything"),
            ("climate change adaptation", "Climate change adaptation"),
            ("101057392", "Project 101057392"),
            ("x", ""),
        ];
        for (query, title) in pairs {
            let s = score(query, &candidate(title, title));
            assert!((0.0..=1.0).contains(&s), "{} vs {} = {}", query, title, s);
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let c = candidate("Advanced Exascale Platform", "exascale");
        assert_eq!(score("exascale", &c), score("exascale", &c));
    }
}
